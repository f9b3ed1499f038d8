// src/server/middleware.rs
use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
};
use log::{info, warn};
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::config::ServerSettings;

/// Wrap any router in the service's middleware stack.
///
/// Outermost first: request log, panic recovery (500), body read timeout,
/// response timeout (408).
pub fn apply(router: Router, settings: &ServerSettings) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            settings.write_timeout(),
        ))
        .layer(RequestBodyTimeoutLayer::new(settings.read_timeout()))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(log_request))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency = started.elapsed();
    if status.is_server_error() {
        warn!("{} {} -> {} in {:?}", method, path, status.as_u16(), latency);
    } else {
        info!("{} {} -> {} in {:?}", method, path, status.as_u16(), latency);
    }

    response
}
