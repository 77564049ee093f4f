// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub lifecycle: build the bus and loader, start modules, stop them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use lifehub_core::{
    EventBus, EventStore, HealthReport, InMemoryEventStore, JsonlEventStore, LoaderError,
    ModuleCatalog, ModuleLoader, ModuleRegistry, StoreError,
};
use lifehub_modules::DataDir;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, HubConfig, StoreConfig};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Invalid log path: {}", .0.display())]
    InvalidLogPath(PathBuf),

    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running set of modules sharing one bus
pub struct Hub {
    loader: ModuleLoader,
    start_time: Instant,
}

impl Hub {
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub async fn health(&self) -> HealthReport {
        self.loader.health_check().await
    }

    /// Shut every ready module down, last started first
    pub async fn shutdown(&self) -> Vec<LoaderError> {
        info!("Shutting down hub...");
        let failures = self.loader.shutdown_all().await;
        for failure in &failures {
            error!(error = %failure, "module shutdown failed");
        }
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            failures = failures.len(),
            "hub stopped"
        );
        failures
    }
}

/// Build the hub and start every module of `catalog`.
///
/// Module failures are logged, not returned: the modules that did start
/// keep running and show up unhealthy in the health report otherwise.
pub async fn startup(config: &HubConfig, catalog: ModuleCatalog) -> Result<Hub, LifecycleError> {
    let store = open_store(config)?;
    let bus = EventBus::new(store).with_config(config.bus.clone());
    let mut loader = ModuleLoader::new(
        Arc::new(ModuleRegistry::new()),
        bus,
        config.loader_config(),
    );
    if let Some(dir) = config.storage_dir() {
        loader = loader.with_database(Arc::new(DataDir(dir.to_path_buf())));
    }

    let catalog = catalog.without(config.disabled.as_slice());
    match loader.load_all(&catalog) {
        Ok(loaded) => info!(modules = ?loaded, "modules loaded"),
        Err(errors) => {
            for line in errors.to_string().lines() {
                error!("{}", line);
            }
        }
    }

    if let Err(e) = loader.initialize_all().await {
        error!(error = %e, "module initialization stopped");
    }
    let ready = loader.initialization_order();
    if ready.len() < catalog.len() {
        warn!(ready = ready.len(), total = catalog.len(), "not every module is ready");
    }

    Ok(Hub {
        loader,
        start_time: Instant::now(),
    })
}

fn open_store(config: &HubConfig) -> Result<Arc<dyn EventStore>, LifecycleError> {
    match &config.store {
        StoreConfig::Memory => Ok(Arc::new(InMemoryEventStore::new())),
        StoreConfig::Jsonl { .. } => {
            let path = config.events_path().ok_or(LifecycleError::NoDataDir)?;
            let store = JsonlEventStore::open(path.clone())?;
            info!(path = %path.display(), "using event log");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
