// src/server/mod.rs
mod lifecycle;
mod middleware;
mod routes;

pub use lifecycle::{RunningServer, Server, ServerState, shutdown_signal};
pub use middleware::apply as apply_middleware;
pub use routes::{AppState, SYNC_ACK, build_router, routes};
