//! waystation server entry point.
//!
//! Boots the worker (install, then activation when requested) and serves it
//! over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use waystation_client::bridge::{ClientRegistry, LoggingOutbox};
use waystation_client::{FetchConfig, HttpNetwork, Worker};
use waystation_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod platform;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting waystation on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let clients = Arc::new(ClientRegistry::new(config.origin_url()?));
    let worker = Arc::new(Worker::new(
        &config,
        db,
        network,
        Arc::new(platform::TracingNotifier),
        clients.clone(),
        Arc::new(LoggingOutbox),
    )?);

    let (installed, activated) = worker.start().await;
    tracing::info!(cached = installed.cached, error = ?installed.population_error, "install finished");
    if let Some(report) = activated {
        tracing::info!(evicted = ?report.evicted, claimed = report.claimed, "activation finished");
    }

    let handler = handler::WaystationServer::new(worker, clients);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
