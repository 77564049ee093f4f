// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lifehub daemon (lifehubd)
//!
//! Hosts the bundled modules on one event bus until asked to stop.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod lifecycle;

use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::HubConfig;
use crate::lifecycle::LifecycleError;

#[derive(Parser)]
#[command(name = "lifehubd", version, about = "lifehub module host")]
struct Cli {
    /// Config file (defaults to <config dir>/lifehub/lifehub.toml)
    #[arg(long, env = "LIFEHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Start every module, print the health report as JSON, then stop
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = HubConfig::load(cli.config.as_deref())?;

    // Held until exit so buffered log lines reach the file
    let log_guard = setup_logging(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting lifehubd");

    let hub = match lifecycle::startup(&config, lifehub_modules::catalog()).await {
        Ok(hub) => hub,
        Err(e) => {
            error!("Failed to start hub: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    info!(ready = ?hub.loader().initialization_order(), "Hub ready");
    println!("READY");

    if cli.check {
        let report = hub.health().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        hub.shutdown().await;
        if !report.is_healthy() {
            error!(unhealthy = ?report.unhealthy(), "health check failed");
            drop(log_guard);
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    hub.shutdown().await;
    Ok(())
}

fn setup_logging(
    config: &HubConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.log_path {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| LifecycleError::InvalidLogPath(path.clone()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}
