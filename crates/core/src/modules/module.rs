// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The contract every feature module implements

use super::context::ModuleContext;
use super::manifest::{ManifestError, ModuleManifest};
use crate::events::{BusError, EventHandler, DEFAULT_PRIORITY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by module code
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid config key '{key}': {source}")]
    Config {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("timed out after {}", humantime::format_duration(*.0))]
    TimedOut(Duration),
}

impl ModuleError {
    pub fn failed(message: impl Into<String>) -> Self {
        ModuleError::Failed(message.into())
    }
}

/// Result of a module's own health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A handler the module wants wired into the bus once it is initialized
#[derive(Clone)]
pub struct HandlerSpec {
    pub pattern: String,
    pub priority: i32,
    pub handler: Arc<dyn EventHandler>,
}

impl HandlerSpec {
    pub fn new(pattern: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            pattern: pattern.into(),
            priority: DEFAULT_PRIORITY,
            handler,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("pattern", &self.pattern)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A pluggable feature unit driven by the loader.
///
/// The loader calls `initialize` once, wires `event_handlers` into the bus,
/// and later calls `shutdown`. Modules hold their own state behind interior
/// mutability since every call takes `&self`.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    fn manifest(&self) -> &ModuleManifest;

    fn name(&self) -> &str {
        &self.manifest().name
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError>;

    async fn shutdown(&self) -> Result<(), ModuleError>;

    /// Handlers subscribed on the module's behalf after `initialize`
    fn event_handlers(&self) -> Vec<HandlerSpec> {
        Vec::new()
    }

    /// `None` means the module has no probe of its own
    async fn health_check(&self) -> Option<HealthStatus> {
        None
    }
}
