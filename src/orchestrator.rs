// src/orchestrator.rs
use log::{error, info};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::Settings;
use crate::db::Database;
use crate::error::{ShutdownError, StartupError};
use crate::jenkins::JenkinsClient;
use crate::server::{AppState, RunningServer, Server, ServerState, build_router, shutdown_signal};

/// Wires settings into a database pool, a Jenkins client and the HTTP server.
pub struct Orchestrator {
    settings: Settings,
    database: Option<Database>,
}

/// Everything that lives between startup and shutdown.
pub struct Service {
    server: RunningServer,
    database: Database,
    drain: Duration,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            database: None,
        }
    }

    /// Use an already built pool instead of opening one from `database.url`.
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Open the pool, initialize Jenkins, then bind. Any failure aborts
    /// before the listener exists.
    pub async fn start(&self) -> Result<Service, StartupError> {
        // 1) Database pool
        let database = match &self.database {
            Some(database) => database.clone(),
            None => Database::connect(&self.settings.database).await?,
        };

        // 2) Jenkins session
        let jenkins = match JenkinsClient::connect(&self.settings.jenkins).await {
            Ok(client) => client,
            Err(e) => {
                database.close().await;
                return Err(e.into());
            }
        };

        // 3) Router and listener
        let state = AppState::new(database.clone(), jenkins);
        let router = build_router(state, &self.settings.server);
        let server = Server::new(router, self.settings.server.addr())
            .with_read_timeout(self.settings.server.read_timeout());
        let server = match server.start().await {
            Ok(server) => server,
            Err(e) => {
                database.close().await;
                return Err(e);
            }
        };

        Ok(Service {
            server,
            database,
            drain: self.settings.server.shutdown_timeout(),
        })
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), StartupError> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until<F>(self, signal: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let service = self.start().await?;
        info!("sync-ci ready on {}. Press Ctrl+C to stop...", service.local_addr());

        signal.await;
        info!("Shutdown signal received, stopping...");

        // already logged; a failed drain does not change how we exit
        let _ = service.stop().await;
        Ok(())
    }
}

impl Service {
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn state(&self) -> ServerState {
        self.server.state()
    }

    /// Drain the HTTP server and close the pool. A failed drain is logged,
    /// never retried, and the pool is closed either way.
    pub async fn stop(self) -> Result<(), ShutdownError> {
        let result = self.server.shutdown(self.drain).await;
        match &result {
            Ok(()) => info!("http server stopped"),
            Err(e) => error!("http server shutdown: {}", e),
        }
        self.database.close().await;
        info!("sync-ci stopped");
        result
    }
}
