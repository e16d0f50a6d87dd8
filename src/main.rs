//! Homedash - a self-hosted home dashboard server
//!
//! Serves weather, system statistics and widget data to the dashboard front end.

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use homedash::app::App;
use homedash::cli::{Cli, Config};
use homedash::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;

    init_logging(&config);

    let addr = config.socket_addr();
    let app = App::build(config)
        .await
        .context("failed to initialize application")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "server listening");

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    app.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
