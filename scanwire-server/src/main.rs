use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use scanwire_core::config::ScanwireConfig;
use scanwire_core::error::{ConfigError, ScanwireError};
use scanwire_scan_engine::SimScanEngine;
use scanwire_server::cli::ServerCli;
use scanwire_server::{AppState, build_router, logging, metrics_server, spawn_heartbeat_push};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServerCli::parse();

    // Load config; a missing file falls back to compiled-in defaults
    // plus environment overrides so the server runs out of the box.
    let mut config = match ScanwireConfig::load(&cli.config).await {
        Ok(config) => config,
        Err(ScanwireError::Config(ConfigError::FileNotFound { path })) => {
            eprintln!("config file {path} not found, using defaults");
            let mut config = ScanwireConfig::default();
            config.apply_env_overrides();
            config
        }
        Err(e) => return Err(anyhow::anyhow!("failed to load config: {}", e)),
    };

    // CLI overrides take precedence over file and environment.
    if let Some(log_level) = cli.log_level {
        config.general.log_level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.general.log_format = log_format;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "scanwire-server starting");

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
        tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
    }

    let engine = Arc::new(SimScanEngine::new(config.engine.clone()));
    let listen = format!("{}:{}", config.server.listen_addr, config.server.port);
    let state = AppState::new(config, engine);

    let heartbeat_task = spawn_heartbeat_push(&state);
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(listen_addr = %listen, "scanwire-server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    // Stop background tasks and session producers.
    tracing::info!("broadcasting shutdown to background tasks");
    shutdown.cancel();
    let _ = heartbeat_task.await;

    tracing::info!("scanwire-server shut down");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = tokio::signal::ctrl_c() => "SIGINT",
        };
        tracing::info!(signal = name, "shutdown signal received");
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!(signal = "SIGINT", "shutdown signal received");
    }
}
