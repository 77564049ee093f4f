// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module loader: registration, dependency ordering and lifecycle.
//!
//! The loader owns the order in which things happen:
//! - `load` / `load_all` register modules and check declared dependencies
//! - `initialize_all` starts modules in dependency order and wires their
//!   handlers into the bus
//! - `shutdown_all` stops them in reverse initialization order
//! - `health_check` aggregates per-module probes
//!
//! Module code never runs inline: every `initialize`, `shutdown` and
//! `health_check` call is spawned, so a panicking module is reported as a
//! failure of that module only.

use super::context::{DatabaseHandle, ModuleConfig, ModuleContext, ModuleEventBus, ModuleLogger};
use super::manifest::{ManifestError, ModuleManifest};
use super::module::{HealthStatus, Module, ModuleError};
use super::registry::{ModuleRegistry, ModuleState, RegistryError};
use crate::events::{panic_message, BusError, EventBus};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// How long a single module health probe may take
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

fn default_health_timeout() -> Duration {
    DEFAULT_HEALTH_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(with = "humantime_serde", default = "default_health_timeout")]
    pub health_timeout: Duration,
    /// Per-module settings, keyed by module name
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            modules: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Builds a fresh module instance
pub type ModuleFactory = fn() -> Result<Arc<dyn Module>, ModuleError>;

#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    pub factory: ModuleFactory,
}

/// The set of modules compiled into the host, in registration order
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, factory: ModuleFactory) -> Self {
        self.add(name, factory);
        self
    }

    pub fn add(&mut self, name: &'static str, factory: ModuleFactory) {
        self.descriptors.push(ModuleDescriptor { name, factory });
    }

    /// Drop the named modules from the catalog
    pub fn without<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.descriptors
            .retain(|d| !names.iter().any(|n| n.as_ref() == d.name));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid manifest for module '{module}': {source}")]
    Manifest {
        module: String,
        #[source]
        source: ManifestError,
    },

    #[error("failed to construct module '{module}': {source}")]
    Construct {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("module '{module}' depends on '{dependency}', which is not registered")]
    MissingDependency { module: String, dependency: String },

    #[error("module '{module}' requires '{dependency}' {required}, found {found}")]
    IncompatibleDependency {
        module: String,
        dependency: String,
        required: VersionReq,
        found: Version,
    },

    #[error("module '{module}' depends on '{dependency}', which failed")]
    FailedDependency { module: String, dependency: String },

    #[error("module '{module}' needs '{dependency}' ready, but it is {state}")]
    DependencyNotReady {
        module: String,
        dependency: String,
        state: ModuleState,
    },

    #[error("cyclic dependency among modules: {}", .modules.join(", "))]
    CyclicDependency { modules: Vec<String> },

    #[error("module '{module}' cannot move from {from} to {to}")]
    InvalidTransition {
        module: String,
        from: ModuleState,
        to: ModuleState,
    },

    #[error("module '{module}' failed to initialize: {source}")]
    Initialization {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("failed to subscribe handlers of module '{module}': {source}")]
    Subscription {
        module: String,
        #[source]
        source: BusError,
    },

    #[error("module '{module}' failed to shut down: {source}")]
    Shutdown {
        module: String,
        #[source]
        source: ModuleError,
    },
}

impl LoaderError {
    /// Module the error is about, if it concerns a single one
    pub fn module(&self) -> Option<&str> {
        match self {
            LoaderError::Registry(RegistryError::NameMismatch { module, .. })
            | LoaderError::Registry(RegistryError::AlreadyRegistered(module))
            | LoaderError::Registry(RegistryError::NotFound(module))
            | LoaderError::Registry(RegistryError::InvalidTransition { module, .. })
            | LoaderError::Manifest { module, .. }
            | LoaderError::Construct { module, .. }
            | LoaderError::MissingDependency { module, .. }
            | LoaderError::IncompatibleDependency { module, .. }
            | LoaderError::FailedDependency { module, .. }
            | LoaderError::DependencyNotReady { module, .. }
            | LoaderError::InvalidTransition { module, .. }
            | LoaderError::Initialization { module, .. }
            | LoaderError::Subscription { module, .. }
            | LoaderError::Shutdown { module, .. } => Some(module.as_str()),
            LoaderError::CyclicDependency { .. } => None,
        }
    }

    /// Part of the module definition or lifecycle that failed
    pub fn field(&self) -> &'static str {
        match self {
            LoaderError::Registry(_) => "name",
            LoaderError::Manifest { .. } => "manifest",
            LoaderError::Construct { .. } => "factory",
            LoaderError::MissingDependency { .. }
            | LoaderError::IncompatibleDependency { .. }
            | LoaderError::FailedDependency { .. }
            | LoaderError::DependencyNotReady { .. }
            | LoaderError::CyclicDependency { .. } => "dependencies",
            LoaderError::InvalidTransition { .. } => "state",
            LoaderError::Initialization { .. } => "initialize",
            LoaderError::Subscription { .. } => "events",
            LoaderError::Shutdown { .. } => "shutdown",
        }
    }
}

/// Every failure from a batch load
#[derive(Debug)]
pub struct LoadErrors {
    pub errors: Vec<LoaderError>,
    /// Modules that loaded despite the failures
    pub loaded: Vec<String>,
}

impl LoadErrors {
    /// Names of the modules that failed
    pub fn modules(&self) -> Vec<&str> {
        self.errors.iter().filter_map(LoaderError::module).collect()
    }
}

impl std::fmt::Display for LoadErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Module loading failed with {} error(s):",
            self.errors.len()
        )?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(
                f,
                "  {}: {}: {}: {}",
                i + 1,
                error.module().unwrap_or("-"),
                error.field(),
                error
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadErrors {}

// ============================================================================
// Health
// ============================================================================

/// Health of every registered module, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthReport(BTreeMap<String, HealthStatus>);

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.0.values().all(|s| s.healthy)
    }

    pub fn get(&self, module: &str) -> Option<&HealthStatus> {
        self.0.get(module)
    }

    pub fn unhealthy(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, s)| !s.healthy)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HealthStatus)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Loader
// ============================================================================

pub struct ModuleLoader {
    registry: Arc<ModuleRegistry>,
    bus: EventBus,
    config: LoaderConfig,
    database: Option<DatabaseHandle>,
    init_order: Mutex<Vec<String>>,
}

impl ModuleLoader {
    pub fn new(registry: Arc<ModuleRegistry>, bus: EventBus, config: LoaderConfig) -> Self {
        Self {
            registry,
            bus,
            config,
            database: None,
            init_order: Mutex::new(Vec::new()),
        }
    }

    /// Storage handed to modules that ask for filesystem access
    pub fn with_database(mut self, database: DatabaseHandle) -> Self {
        self.database = Some(database);
        self
    }

    pub fn database(&self) -> Option<&DatabaseHandle> {
        self.database.as_ref()
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a single module and check its dependencies against the
    /// modules registered so far.
    ///
    /// A dependency failure leaves the module registered in `Error`.
    pub fn load(&self, module: Arc<dyn Module>) -> Result<(), LoaderError> {
        let manifest = module.manifest().clone();
        self.registry.register(module, manifest.clone())?;

        if let Err(err) = self.check(&manifest) {
            self.fail(&manifest.name, &err);
            return Err(err);
        }
        Ok(())
    }

    /// Build and register every module of the catalog, then check
    /// dependencies.
    ///
    /// One bad module never blocks the others; a module whose dependency
    /// fails is failed as well. Returns the names that loaded cleanly.
    pub fn load_all(&self, catalog: &ModuleCatalog) -> Result<Vec<String>, LoadErrors> {
        let mut errors = Vec::new();
        let mut pending: Vec<ModuleManifest> = Vec::new();

        for descriptor in catalog.iter() {
            let module = match (descriptor.factory)() {
                Ok(module) => module,
                Err(source) => {
                    errors.push(LoaderError::Construct {
                        module: descriptor.name.to_string(),
                        source,
                    });
                    continue;
                }
            };

            let manifest = module.manifest().clone();
            if manifest.name != descriptor.name {
                errors.push(
                    RegistryError::NameMismatch {
                        module: descriptor.name.to_string(),
                        manifest: manifest.name,
                    }
                    .into(),
                );
                continue;
            }

            match self.registry.register(module, manifest.clone()) {
                Ok(()) => pending.push(manifest),
                Err(err) => errors.push(err.into()),
            }
        }

        // Repeat until stable: each failure may break modules depending on it
        loop {
            let mut failed = false;
            let mut passed = Vec::with_capacity(pending.len());
            for manifest in pending {
                match self.check(&manifest) {
                    Ok(()) => passed.push(manifest),
                    Err(err) => {
                        self.fail(&manifest.name, &err);
                        errors.push(err);
                        failed = true;
                    }
                }
            }
            pending = passed;
            if !failed {
                break;
            }
        }

        let loaded: Vec<String> = pending.into_iter().map(|m| m.name).collect();
        if errors.is_empty() {
            tracing::info!(modules = loaded.len(), "loaded modules");
            Ok(loaded)
        } else {
            tracing::warn!(
                loaded = loaded.len(),
                failed = errors.len(),
                "some modules failed to load"
            );
            Err(LoadErrors { errors, loaded })
        }
    }

    fn check(&self, manifest: &ModuleManifest) -> Result<(), LoaderError> {
        manifest
            .validate()
            .map_err(|source| LoaderError::Manifest {
                module: manifest.name.clone(),
                source,
            })?;

        for (dependency, required) in &manifest.dependencies {
            let Ok(found) = self.registry.metadata(dependency) else {
                return Err(LoaderError::MissingDependency {
                    module: manifest.name.clone(),
                    dependency: dependency.clone(),
                });
            };
            if found.state == ModuleState::Error {
                return Err(LoaderError::FailedDependency {
                    module: manifest.name.clone(),
                    dependency: dependency.clone(),
                });
            }
            if !required.matches(&found.manifest.version) {
                return Err(LoaderError::IncompatibleDependency {
                    module: manifest.name.clone(),
                    dependency: dependency.clone(),
                    required: required.clone(),
                    found: found.manifest.version,
                });
            }
        }
        Ok(())
    }

    /// Atomically enter `next`; a caller that lost a race sees the state it lost to
    fn claim(&self, name: &str, next: ModuleState) -> Result<(), LoaderError> {
        match self.registry.transition(name, next) {
            Ok(_) => Ok(()),
            Err(RegistryError::InvalidTransition { module, from, to }) => {
                Err(LoaderError::InvalidTransition { module, from, to })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fail(&self, name: &str, err: &LoaderError) {
        if let Err(e) = self.registry.mark_failed(name, err.to_string()) {
            tracing::warn!(module = name, error = %e, "could not record module failure");
        }
    }

    /// Registered modules ordered so that dependencies come first
    pub fn dependency_order(&self) -> Result<Vec<String>, LoaderError> {
        let modules = self.registry.all_metadata();
        let mut graph = DiGraph::<&str, ()>::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for metadata in &modules {
            let name = metadata.name.as_str();
            nodes.insert(name, graph.add_node(name));
        }

        for metadata in &modules {
            for dependency in metadata.manifest.dependencies.keys() {
                if let (Some(&from), Some(&to)) = (
                    nodes.get(dependency.as_str()),
                    nodes.get(metadata.name.as_str()),
                ) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|idx| graph[idx].to_string()).collect()),
            Err(cycle) => {
                let node = cycle.node_id();
                let members = tarjan_scc(&graph)
                    .into_iter()
                    .find(|scc| scc.contains(&node))
                    .unwrap_or_else(|| vec![node]);
                let mut modules: Vec<String> =
                    members.into_iter().map(|idx| graph[idx].to_string()).collect();
                modules.sort();
                Err(LoaderError::CyclicDependency { modules })
            }
        }
    }

    /// Initialize one registered module and subscribe its handlers.
    ///
    /// Every dependency must already be `Ready`.
    pub async fn initialize(&self, name: &str) -> Result<(), LoaderError> {
        let metadata = self.registry.metadata(name)?;
        if !metadata.state.can_transition_to(ModuleState::Initializing) {
            return Err(LoaderError::InvalidTransition {
                module: name.to_string(),
                from: metadata.state,
                to: ModuleState::Initializing,
            });
        }

        for dependency in metadata.manifest.dependencies.keys() {
            let state = self
                .registry
                .state(dependency)
                .unwrap_or(ModuleState::Unregistered);
            if state != ModuleState::Ready {
                return Err(LoaderError::DependencyNotReady {
                    module: name.to_string(),
                    dependency: dependency.clone(),
                    state,
                });
            }
        }

        let module = self.registry.module(name)?;
        self.claim(name, ModuleState::Initializing)?;
        tracing::info!(module = name, "initializing module");

        let ctx = self.context_for(&metadata.manifest);
        let task = {
            let module = Arc::clone(&module);
            async move { module.initialize(ctx).await }
        };
        if let Err(source) = run_isolated(task, None).await {
            self.bus.unsubscribe_subscriber(name);
            let err = LoaderError::Initialization {
                module: name.to_string(),
                source,
            };
            self.fail(name, &err);
            return Err(err);
        }

        for spec in module.event_handlers() {
            if let Err(source) = self
                .bus
                .subscribe(&spec.pattern, spec.handler, name, spec.priority)
            {
                self.bus.unsubscribe_subscriber(name);
                let err = LoaderError::Subscription {
                    module: name.to_string(),
                    source,
                };
                self.fail(name, &err);
                return Err(err);
            }
        }

        self.registry.update_state(name, ModuleState::Ready)?;
        self.init_order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.to_string());
        tracing::info!(module = name, "module ready");
        Ok(())
    }

    /// Initialize every `Registered` module in dependency order.
    ///
    /// Stops at the first failure; modules already `Ready` stay up.
    pub async fn initialize_all(&self) -> Result<(), LoaderError> {
        let order = self.dependency_order()?;
        tracing::debug!(?order, "module initialization order");

        for name in &order {
            match self.registry.state(name) {
                Some(ModuleState::Registered) => self.initialize(name).await?,
                Some(state) => tracing::debug!(module = %name, %state, "skipping module"),
                None => {}
            }
        }
        Ok(())
    }

    /// Names of modules in the order they became ready
    pub fn initialization_order(&self) -> Vec<String> {
        self.init_order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Shut down one `Ready` module and drop its subscriptions
    pub async fn shutdown(&self, name: &str) -> Result<(), LoaderError> {
        let state = self
            .registry
            .state(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !state.can_transition_to(ModuleState::ShuttingDown) {
            return Err(LoaderError::InvalidTransition {
                module: name.to_string(),
                from: state,
                to: ModuleState::ShuttingDown,
            });
        }

        let module = self.registry.module(name)?;
        self.claim(name, ModuleState::ShuttingDown)?;
        let removed = self.bus.unsubscribe_subscriber(name);
        tracing::info!(module = name, subscriptions = removed, "shutting down module");

        match run_isolated(async move { module.shutdown().await }, None).await {
            Ok(()) => {
                self.registry.update_state(name, ModuleState::Shutdown)?;
                Ok(())
            }
            Err(source) => {
                let err = LoaderError::Shutdown {
                    module: name.to_string(),
                    source,
                };
                self.fail(name, &err);
                Err(err)
            }
        }
    }

    /// Shut down ready modules, last initialized first.
    ///
    /// Failures are logged and collected; the sequence always completes.
    pub async fn shutdown_all(&self) -> Vec<LoaderError> {
        let mut failures = Vec::new();
        for name in self.initialization_order().iter().rev() {
            if self.registry.state(name) != Some(ModuleState::Ready) {
                continue;
            }
            if let Err(err) = self.shutdown(name).await {
                tracing::warn!(module = %name, error = %err, "module shutdown failed, continuing");
                failures.push(err);
            }
        }
        failures
    }

    /// Probe every registered module
    pub async fn health_check(&self) -> HealthReport {
        let mut report = BTreeMap::new();

        for metadata in self.registry.all_metadata() {
            let status = if metadata.state == ModuleState::Ready {
                match self.registry.module(&metadata.name) {
                    Ok(module) => self.probe(module).await,
                    Err(e) => HealthStatus::unhealthy(e.to_string()),
                }
            } else {
                let message = match &metadata.error {
                    Some(error) => format!("{}: {}", metadata.state, error),
                    None => metadata.state.to_string(),
                };
                HealthStatus::unhealthy(message)
            };
            report.insert(metadata.name, status);
        }

        HealthReport(report)
    }

    async fn probe(&self, module: Arc<dyn Module>) -> HealthStatus {
        let task = async move { Ok(module.health_check().await) };
        match run_isolated(task, Some(self.config.health_timeout)).await {
            Ok(Some(status)) => status,
            Ok(None) => HealthStatus::healthy(),
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }

    fn context_for(&self, manifest: &ModuleManifest) -> ModuleContext {
        let name = manifest.name.as_str();
        ModuleContext {
            event_bus: ModuleEventBus::new(self.bus.clone(), name),
            logger: ModuleLogger::new(name),
            config: self.config.modules.get(name).cloned().unwrap_or_default(),
            database: self
                .database
                .as_ref()
                .filter(|_| manifest.grants_storage())
                .cloned(),
        }
    }
}

/// Run module code on its own task, turning a panic or timeout into an error
async fn run_isolated<T, F>(future: F, timeout: Option<Duration>) -> Result<T, ModuleError>
where
    F: Future<Output = Result<T, ModuleError>> + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::spawn(future);
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                return Err(ModuleError::TimedOut(limit));
            }
        },
        None => task.await,
    };
    joined.map_err(|e| ModuleError::Panicked(panic_message(e)))?
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
