//! Exporter gateway binary.
//!
//! Serves the Cosmos node exporter over HTTP:
//!
//! - `GET /metrics`: runs one collection cycle and returns the Prometheus
//!   text exposition.
//! - `GET /health`: liveness only.
//!
//! With `--oneshot` it collects once, prints the exposition to stdout and
//! exits.

mod config;
mod logging;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;

use config::Cli;
use state::{AppState, SharedState};

fn main() {
    if let Err(e) = run() {
        eprintln!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.load_config().context("failed to load config")?;
    logging::init(&cfg.log)?;

    // The RPC client is blocking; build it before any runtime exists.
    let collectors =
        exporter::collectors::from_config(&cfg).context("failed to build clients")?;
    for collector in &collectors {
        tracing::info!(
            collector = collector.name(),
            enabled = collector.enabled(),
            "collector registered"
        );
    }

    let app_state: SharedState = Arc::new(AppState {
        collectors,
        collect_timeout: cfg.collect_timeout(),
    });

    if cli.oneshot {
        let body = app_state.scrape().context("failed to render metrics")?;
        print!("{body}");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    // Keep one handle out here: the blocking HTTP client must not be
    // dropped on a runtime thread.
    let result = runtime.block_on(serve(app_state.clone(), cfg.listen_addr));
    drop(runtime);
    drop(app_state);
    result
}

async fn serve(app_state: SharedState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("exporter listening on http://{}/metrics", addr);

    axum::serve(listener, routes::router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
