//! ferrokv server binary.

use anyhow::Context;
use clap::Parser;
use ferrokv::config::Config;
use ferrokv::server::Server;
use ferrokv::snapshot::load_snapshot;
use ferrokv::storage::StorageEngine;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::parse());

    ferrokv::logging::init(config.log_filter())?;

    info!(
        version = ferrokv::VERSION,
        address = %config.bind_address(),
        dir = %config.dir.display(),
        dbfilename = %config.dbfilename,
        "Starting ferrokv"
    );

    let storage = Arc::new(StorageEngine::new());
    load_snapshot(&config.snapshot_path(), &storage);

    let server = match Server::bind(Arc::clone(&config), storage).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Could not start listener");
            return Err(e).context("startup failed");
        }
    };

    server
        .serve(async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
