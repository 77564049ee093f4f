// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `core` module: counts every event that crosses the bus

use crate::event_types;
use async_trait::async_trait;
use lifehub_core::{
    handler_fn, Event, HandlerError, HandlerSpec, HealthStatus, Module, ModuleContext,
    ModuleError, ModuleManifest,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const MANIFEST: &str = include_str!("manifests/core.json");

/// Runs after every other handler
const AUDIT_PRIORITY: i32 = -100;

#[derive(Default)]
struct AuditTrail {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl AuditTrail {
    fn record(&self, event_type: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(event_type.to_string()).or_default() += 1;
    }

    fn counts(&self) -> BTreeMap<String, u64> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn total(&self) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }
}

pub struct CoreModule {
    manifest: ModuleManifest,
    trail: Arc<AuditTrail>,
}

impl CoreModule {
    pub fn new() -> Result<Self, ModuleError> {
        Ok(Self {
            manifest: ModuleManifest::from_json(MANIFEST)?,
            trail: Arc::default(),
        })
    }

    pub fn create() -> Result<Arc<dyn Module>, ModuleError> {
        Ok(Arc::new(Self::new()?))
    }

    /// Events observed so far, by type
    pub fn counts(&self) -> BTreeMap<String, u64> {
        self.trail.counts()
    }
}

#[async_trait]
impl Module for CoreModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        ctx.logger.info("audit trail started");
        ctx.event_bus
            .emit(
                event_types::CORE_STARTED,
                json!({ "version": self.manifest.version.to_string() }),
            )
            .await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        tracing::info!(module = "core", events = self.trail.total(), "audit trail closed");
        Ok(())
    }

    fn event_handlers(&self) -> Vec<HandlerSpec> {
        let trail = Arc::clone(&self.trail);
        let handler = handler_fn(move |event: Event| {
            trail.record(event.event_type());
            async { Ok::<(), HandlerError>(()) }
        });
        vec![HandlerSpec::new("*", handler).priority(AUDIT_PRIORITY)]
    }

    async fn health_check(&self) -> Option<HealthStatus> {
        let total = self.trail.total();
        Some(HealthStatus::healthy().with_message(format!("{total} events observed")))
    }
}
