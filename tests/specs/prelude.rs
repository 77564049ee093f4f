//! Shared helpers for the behavioral specs

use async_trait::async_trait;
use lifehub_core::{
    handler_fn, EventBus, EventHandler, HandlerError, LoaderConfig, Module, ModuleContext,
    ModuleError, ModuleEventBus, ModuleLoader, ModuleManifest, ModuleRegistry,
};
use semver::{Version, VersionReq};
use std::sync::{Arc, Mutex, OnceLock};

/// Ordered record of side effects
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Handler that appends `entry` each time it runs
    pub fn recorder(&self, entry: &str) -> Arc<dyn EventHandler> {
        let log = self.clone();
        let entry = entry.to_string();
        handler_fn(move |_| {
            log.push(entry.clone());
            async { Ok::<(), HandlerError>(()) }
        })
    }
}

/// Owned copies, for comparing against logs with `similar_asserts`
pub fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn loader() -> ModuleLoader {
    ModuleLoader::new(
        Arc::new(ModuleRegistry::new()),
        EventBus::in_memory(),
        LoaderConfig::default(),
    )
}

/// Module that records, on initialize, the registry state of each of its
/// dependencies as `"<name> saw <dependency>=<state>"`
pub struct Probe {
    manifest: ModuleManifest,
    registry: Arc<ModuleRegistry>,
    log: Log,
    bus: OnceLock<ModuleEventBus>,
}

impl Probe {
    pub fn new(name: &str, registry: &Arc<ModuleRegistry>, log: &Log) -> Self {
        Self {
            manifest: ModuleManifest::new(name, Version::new(1, 0, 0)),
            registry: Arc::clone(registry),
            log: log.clone(),
            bus: OnceLock::new(),
        }
    }

    pub fn requires(mut self, name: &str) -> Self {
        self.manifest = self.manifest.depends_on(name, VersionReq::STAR);
        self
    }

    /// The bus facade handed to `initialize`
    pub fn bus(&self) -> &ModuleEventBus {
        self.bus.get().unwrap()
    }
}

#[async_trait]
impl Module for Probe {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        for dependency in self.manifest.dependencies.keys() {
            let state = self
                .registry
                .state(dependency)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "missing".to_string());
            self.log
                .push(format!("{} saw {}={}", self.manifest.name, dependency, state));
        }
        self.log.push(format!("initialize:{}", self.manifest.name));
        let _ = self.bus.set(ctx.event_bus);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        self.log.push(format!("shutdown:{}", self.manifest.name));
        Ok(())
    }
}
