// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable module for exercising the registry and loader

use super::context::ModuleContext;
use super::manifest::{ModuleManifest, Permission};
use super::module::{HandlerSpec, HealthStatus, Module, ModuleError};
use async_trait::async_trait;
use semver::{Version, VersionReq};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// Shared record of lifecycle calls, as `"initialize:<name>"` / `"shutdown:<name>"`
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeModule {
    manifest: ModuleManifest,
    calls: CallLog,
    fail_initialize: Option<String>,
    panic_on_initialize: bool,
    fail_shutdown: Option<String>,
    health: Option<HealthStatus>,
    health_delay: Option<Duration>,
    initialize_delay: Option<Duration>,
    handlers: Vec<HandlerSpec>,
    context: OnceLock<ModuleContext>,
}

impl FakeModule {
    pub fn new(name: &str) -> Self {
        Self {
            manifest: ModuleManifest::new(name, Version::new(1, 0, 0)),
            calls: CallLog::default(),
            fail_initialize: None,
            panic_on_initialize: false,
            fail_shutdown: None,
            health: None,
            health_delay: None,
            initialize_delay: None,
            handlers: Vec::new(),
            context: OnceLock::new(),
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.manifest.version = version;
        self
    }

    pub fn depends_on(mut self, name: &str, requirement: VersionReq) -> Self {
        self.manifest = self.manifest.depends_on(name, requirement);
        self
    }

    /// Depend on any version of `name`
    pub fn requires(self, name: &str) -> Self {
        self.depends_on(name, VersionReq::STAR)
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.manifest = self.manifest.permission(permission);
        self
    }

    pub fn calls(mut self, log: &CallLog) -> Self {
        self.calls = Arc::clone(log);
        self
    }

    pub fn fail_initialize(mut self, message: &str) -> Self {
        self.fail_initialize = Some(message.to_string());
        self
    }

    pub fn panic_on_initialize(mut self) -> Self {
        self.panic_on_initialize = true;
        self
    }

    pub fn fail_shutdown(mut self, message: &str) -> Self {
        self.fail_shutdown = Some(message.to_string());
        self
    }

    pub fn health(mut self, status: HealthStatus) -> Self {
        self.health = Some(status);
        self
    }

    /// Sleep this long inside the health probe
    pub fn slow_health(mut self, delay: Duration) -> Self {
        self.health_delay = Some(delay);
        self
    }

    /// Sleep this long inside `initialize`
    pub fn slow_initialize(mut self, delay: Duration) -> Self {
        self.initialize_delay = Some(delay);
        self
    }

    pub fn handler(mut self, spec: HandlerSpec) -> Self {
        self.handlers.push(spec);
        self
    }

    /// Context received by `initialize`, if it ran
    pub fn context(&self) -> Option<&ModuleContext> {
        self.context.get()
    }

    fn record(&self, call: &str) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}:{}", call, self.manifest.name));
    }
}

#[allow(clippy::panic)]
#[async_trait]
impl Module for FakeModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        self.record("initialize");
        if let Some(delay) = self.initialize_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on_initialize {
            panic!("{} exploded", self.manifest.name);
        }
        if let Some(message) = &self.fail_initialize {
            return Err(ModuleError::failed(message.clone()));
        }
        let _ = self.context.set(ctx);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        self.record("shutdown");
        match &self.fail_shutdown {
            Some(message) => Err(ModuleError::failed(message.clone())),
            None => Ok(()),
        }
    }

    fn event_handlers(&self) -> Vec<HandlerSpec> {
        self.handlers.clone()
    }

    async fn health_check(&self) -> Option<HealthStatus> {
        if let Some(delay) = self.health_delay {
            tokio::time::sleep(delay).await;
        }
        self.health.clone()
    }
}
