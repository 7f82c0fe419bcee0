//! TCP listener and graceful shutdown.
//!
//! The accept loop never waits on a connection: every accepted socket is
//! handed to its own [`Connection`] task and the loop goes straight back to
//! `accept`. On shutdown the loop stops accepting and waits for in-flight
//! connections to finish.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::connection::Connection;
use crate::error::Result;
use crate::router::Router;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after a failed `accept` before trying again.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The HTTP listener.
pub struct Server {
    listener: TcpListener,
    io_timeout: Duration,
}

impl Server {
    /// Binds the listening socket. Port `0` picks a free port; see
    /// [`Server::local_addr`].
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            io_timeout: DEFAULT_IO_TIMEOUT,
        })
    }

    /// Sets the idle timeout applied to every read and write on a connection.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, router: Router) -> Result<()> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown<F>(self, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let router = Arc::new(router);
        let addr = self.local_addr()?;
        info!(%addr, domain = router.domain(), "wormhole listening");

        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting even if
                // more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let Some((stream, peer)) = accepted(res).await else {
                        continue;
                    };

                    let connection = Connection::new(stream, peer, Arc::clone(&router), self.io_timeout);
                    tasks.spawn(connection.run());
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("wormhole stopped");
        Ok(())
    }
}

/// Unwraps an accept result. Failures (typically EMFILE or ENFILE) are
/// logged and followed by [`ACCEPT_ERROR_BACKOFF`] so the loop does not spin.
async fn accepted<T>(res: std::io::Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            error!("accept error: {e}");
            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            None
        }
    }
}

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both SIGTERM and SIGINT (Ctrl-C); elsewhere only
/// Ctrl-C is available. A handler that fails to install never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn accept_error_backs_off() {
        let start = Instant::now();
        let res = accepted::<()>(Err(io::Error::from(io::ErrorKind::Other))).await;

        assert!(res.is_none());
        assert!(start.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_connection_passes_through() {
        let start = Instant::now();
        assert_eq!(accepted(Ok(7)).await, Some(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
