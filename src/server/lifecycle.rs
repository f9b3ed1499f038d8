// src/server/lifecycle.rs
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{ShutdownError, StartupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// An HTTP server that has not bound its socket yet.
pub struct Server {
    router: Router,
    addr: String,
    read_timeout: Duration,
    state: watch::Sender<ServerState>,
}

impl Server {
    pub fn new(router: Router, addr: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            router,
            addr: addr.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            state,
        }
    }

    /// How long a connection may take to deliver a complete request head.
    /// Connections that stall past it are dropped.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Bind the socket and spawn the serve loop. Returns as soon as the
    /// loop is spawned; it does not wait for the first accept.
    pub async fn start(self) -> Result<RunningServer, StartupError> {
        let bind_error = |source| StartupError::Bind {
            addr: self.addr.clone(),
            source,
        };
        let listener = TcpListener::bind(&self.addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        info!("listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, self.router, self.read_timeout, shutdown_rx));

        self.state.send_replace(ServerState::Listening);

        Ok(RunningServer {
            local_addr,
            handle,
            shutdown_tx,
            state: self.state,
        })
    }
}

/// A server whose serve loop is running in its own task.
pub struct RunningServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
    state: watch::Sender<ServerState>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch state transitions. The receiver keeps the last value after the
    /// server is gone.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Stop accepting, let in-flight requests finish, and give up after `drain`.
    ///
    /// The server ends up `Stopped` whatever the outcome; a timed-out serve
    /// loop is aborted.
    pub async fn shutdown(self, drain: Duration) -> Result<(), ShutdownError> {
        let RunningServer {
            local_addr,
            handle,
            shutdown_tx,
            state,
        } = self;

        state.send_replace(ServerState::ShuttingDown);
        info!("Draining http server on {} (deadline {:?})", local_addr, drain);
        let _ = shutdown_tx.send(());

        let abort = handle.abort_handle();
        let result = match tokio::time::timeout(drain, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ShutdownError::Join(e)),
            Err(_) => {
                abort.abort();
                Err(ShutdownError::DrainTimeout(drain))
            }
        };

        state.send_replace(ServerState::Stopped);
        result
    }
}

/// Accept loop. Each connection runs in its own task and is told to finish
/// once `shutdown` fires; the loop returns when the last connection is gone.
async fn serve(
    listener: TcpListener,
    router: Router,
    read_timeout: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    // plain HTTP/1.1; skipping protocol sniffing also keeps the head
    // timeout in charge from the first byte
    let mut builder = Builder::new(TokioExecutor::new()).http1_only();
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);

    // dropping `stop_tx` tells connections to wind down; `closed_tx`
    // resolves once every connection dropped its `closed_rx`
    let (stop_tx, stop_rx) = watch::channel(());
    let (closed_tx, closed_rx) = watch::channel(());

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            // a dropped sender also means stop
            _ = &mut shutdown => break,
        };

        let builder = builder.clone();
        let service = TowerToHyperService::new(router.clone());
        let mut stop_rx = stop_rx.clone();
        let closed_rx = closed_rx.clone();

        tokio::spawn(async move {
            let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = stop_rx.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };
            if let Err(e) = result {
                debug!("connection from {} closed: {}", peer, e);
            }
            drop(closed_rx);
        });
    }

    drop(listener);
    drop(stop_rx);
    drop(stop_tx);
    drop(closed_rx);
    closed_tx.closed().await;
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
