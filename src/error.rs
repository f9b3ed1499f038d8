// src/error.rs
use std::time::Duration;

use crate::jenkins::JenkinsError;

/// Anything that stops the service from reaching the listening state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("load config failed: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("setup db failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("setup jenkins failed: {0}")]
    Jenkins(#[from] JenkinsError),

    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("in-flight requests did not drain within {0:?}")]
    DrainTimeout(Duration),

    #[error("http server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
