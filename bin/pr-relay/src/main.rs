//! PagerRelay Server
//!
//! Accepts decoded pager messages over HTTP and relays them to Slack and
//! Telegram. Runs the periodic health check and serves monitoring endpoints.
//!
//! ## Configuration
//!
//! Read from `PAGERELAY_CONFIG` or the default search path, then overridden
//! by `PAGERELAY_*` environment variables. Run with `--example-config` to
//! print an annotated configuration file.

use std::sync::Arc;
use anyhow::{Context, Result};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use pr_config::{ConfigLoader, RelayConfig};
use pr_router::{api::create_router, PagerRelay};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().skip(1).any(|arg| arg == "--example-config") {
        print!("{}", RelayConfig::example_toml());
        return Ok(());
    }

    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    pr_common::logging::init_logging("pr-relay");

    info!("Starting PagerRelay");

    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let relay = Arc::new(PagerRelay::from_config(&config)?);
    relay.start();

    let app = create_router(relay.clone())
        .route(
            "/metrics",
            get(move || {
                let prometheus = prometheus.clone();
                async move { prometheus.render() }
            }),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, "Starting HTTP API server");

    info!(
        channels = relay.dispatchers().len(),
        health_check_interval_secs = relay.health_check().interval().as_secs(),
        "PagerRelay started. Press Ctrl+C to shutdown."
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received...");
    relay.shutdown().await;

    info!("PagerRelay shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
