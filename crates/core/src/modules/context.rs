// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-module view of the host: scoped bus, logger, config and storage

use super::module::ModuleError;
use crate::events::{
    BusError, Event, EventBus, EventHandler, PublishOptions, DEFAULT_PRIORITY,
};
use crate::id::SubscriptionId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

/// Opaque storage handle supplied by the host, downcast by the module
pub type DatabaseHandle = Arc<dyn Any + Send + Sync>;

/// Free-form settings for one module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleConfig(Map<String, Value>);

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Typed lookup; a missing key is `Ok(None)`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ModuleError> {
        self.0
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| ModuleError::Config {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ModuleError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ModuleConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Event bus facade that attributes everything to one module
#[derive(Clone)]
pub struct ModuleEventBus {
    bus: EventBus,
    module: String,
}

impl ModuleEventBus {
    pub fn new(bus: EventBus, module: impl Into<String>) -> Self {
        Self {
            bus,
            module: module.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub async fn publish(&self, event: Event) -> Result<(), BusError> {
        self.bus.publish(event, PublishOptions::default()).await
    }

    pub async fn publish_with(&self, event: Event, options: PublishOptions) -> Result<(), BusError> {
        self.bus.publish(event, options).await
    }

    /// Build an event sourced from this module and publish it
    pub async fn emit(&self, event_type: &str, payload: Value) -> Result<Event, BusError> {
        let event = self
            .bus
            .stamp(Event::builder(event_type, self.module.as_str()).payload(payload));
        self.bus
            .publish(event.clone(), PublishOptions::default())
            .await?;
        Ok(event)
    }

    pub fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
        priority: Option<i32>,
    ) -> Result<SubscriptionId, BusError> {
        self.bus.subscribe(
            pattern,
            handler,
            &self.module,
            priority.unwrap_or(DEFAULT_PRIORITY),
        )
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}

/// Logger that tags every record with the module name
#[derive(Debug, Clone)]
pub struct ModuleLogger {
    module: String,
}

impl ModuleLogger {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(module = %self.module, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(module = %self.module, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(module = %self.module, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(module = %self.module, "{message}");
    }
}

/// Everything a module receives at initialization
#[derive(Clone)]
pub struct ModuleContext {
    pub event_bus: ModuleEventBus,
    pub logger: ModuleLogger,
    pub config: ModuleConfig,
    pub database: Option<DatabaseHandle>,
}

impl ModuleContext {
    pub fn module_name(&self) -> &str {
        self.event_bus.module_name()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
