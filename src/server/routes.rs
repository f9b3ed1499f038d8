// src/server/routes.rs
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    routing::{get, post},
};
use log::debug;

use crate::config::ServerSettings;
use crate::db::Database;
use crate::jenkins::JenkinsClient;

use super::middleware;

/// Handles shared with every request. Both are read-only after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jenkins: JenkinsClient,
}

impl AppState {
    pub fn new(db: Database, jenkins: JenkinsClient) -> Self {
        Self { db, jenkins }
    }
}

pub const SYNC_ACK: &str = "resource";

async fn ping() -> &'static str {
    "pong"
}

// Acknowledges the notification without reading the payload. Nothing is persisted yet.
async fn sync_job(State(state): State<AppState>, headers: HeaderMap) -> Json<&'static str> {
    let length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    debug!(
        "Job sync notification received ({} bytes), jenkins at {}",
        length,
        state.jenkins.base_url()
    );
    Json(SYNC_ACK)
}

fn api_v1() -> Router<AppState> {
    Router::new().route("/ci/job/sync", post(sync_job))
}

/// The service's routes, without middleware.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest("/api/v1", api_v1())
        .with_state(state)
}

/// The full application: routes wrapped in logging, recovery and timeouts.
pub fn build_router(state: AppState, settings: &ServerSettings) -> Router {
    middleware::apply(routes(state), settings)
}
