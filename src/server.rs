//! TCP Server
//!
//! Binds the listener, runs the background expiry sweeper, and spawns one
//! task per accepted client. A failure to bind is fatal; a failure on a
//! single connection is not.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::{start_expiry_sweeper, StorageEngine};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before retrying `accept` after `failures` consecutive errors.
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << failures.saturating_sub(1).min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound, not yet serving, listener.
pub struct Server {
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    config: Arc<Config>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    pub async fn bind(config: Arc<Config>, storage: Arc<StorageEngine>) -> Result<Self, ServerError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            storage,
            config,
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts clients until `shutdown` completes. The expiry sweeper runs
    /// for exactly as long as this call.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let _sweeper = start_expiry_sweeper(Arc::clone(&self.storage));

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Ready to accept connections");
        }

        tokio::select! {
            _ = self.accept_loop() => {}
            _ = shutdown => {
                info!("Shutdown signal received, no longer accepting clients");
            }
        }

        let storage = self.storage.stats();
        info!(
            keys = storage.keys,
            hashes = storage.hashes,
            expired = storage.expired,
            "Server stopped"
        );
        Ok(())
    }

    async fn accept_loop(&self) {
        let mut failures = 0u32;
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    failures = 0;
                    let handler =
                        CommandHandler::new(Arc::clone(&self.storage), Arc::clone(&self.config));
                    let stats = Arc::clone(&self.stats);
                    tokio::spawn(handle_connection(stream, addr, handler, stats));
                }
                Err(e) => {
                    // Errors like EMFILE persist until a descriptor frees up.
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    error!(error = %e, retry_in = ?delay, "Failed to accept connection");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
