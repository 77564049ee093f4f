// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative map of module name to instance, manifest and lifecycle state

use super::manifest::ModuleManifest;
use super::module::Module;
use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Lifecycle of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Unregistered,
    Registered,
    Initializing,
    Ready,
    Error,
    ShuttingDown,
    Shutdown,
}

impl ModuleState {
    /// `Error` and `Shutdown` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModuleState::Error | ModuleState::Shutdown)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ModuleState) -> bool {
        use ModuleState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Unregistered, Registered)
                | (Registered, Initializing)
                | (Initializing, Ready)
                | (Ready, ShuttingDown)
                | (ShuttingDown, Shutdown)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Unregistered => "unregistered",
            ModuleState::Registered => "registered",
            ModuleState::Initializing => "initializing",
            ModuleState::Ready => "ready",
            ModuleState::Error => "error",
            ModuleState::ShuttingDown => "shutting_down",
            ModuleState::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module name '{module}' does not match manifest name '{manifest}'")]
    NameMismatch { module: String, manifest: String },
    #[error("module already registered: {0}")]
    AlreadyRegistered(String),
    #[error("module not found: {0}")]
    NotFound(String),
    #[error("module '{module}' cannot move from {from} to {to}")]
    InvalidTransition {
        module: String,
        from: ModuleState,
        to: ModuleState,
    },
}

struct ModuleEntry {
    module: Arc<dyn Module>,
    manifest: ModuleManifest,
    state: ModuleState,
    error: Option<String>,
    registered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ModuleEntry {
    fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            name: self.manifest.name.clone(),
            manifest: self.manifest.clone(),
            state: self.state,
            error: self.error.clone(),
            registered_at: self.registered_at,
            updated_at: self.updated_at,
        }
    }
}

/// Snapshot of a registry entry without the module instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    pub name: String,
    pub manifest: ModuleManifest,
    pub state: ModuleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub by_state: BTreeMap<ModuleState, usize>,
}

/// Registered modules, in registration order.
///
/// Entries are created by [`register`](Self::register) and only change
/// through [`update_state`](Self::update_state) and
/// [`mark_failed`](Self::mark_failed).
pub struct ModuleRegistry {
    entries: RwLock<Vec<ModuleEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub fn register(
        &self,
        module: Arc<dyn Module>,
        manifest: ModuleManifest,
    ) -> Result<(), RegistryError> {
        if module.name() != manifest.name {
            return Err(RegistryError::NameMismatch {
                module: module.name().to_string(),
                manifest: manifest.name,
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.manifest.name == manifest.name) {
            return Err(RegistryError::AlreadyRegistered(manifest.name));
        }

        let now = self.clock.now();
        tracing::info!(module = %manifest.name, version = %manifest.version, "registered module");
        entries.push(ModuleEntry {
            module,
            manifest,
            state: ModuleState::Registered,
            error: None,
            registered_at: now,
            updated_at: now,
        });
        Ok(())
    }

    fn with_entry<T>(&self, name: &str, f: impl FnOnce(&ModuleEntry) -> T) -> Result<T, RegistryError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|e| e.manifest.name == name)
            .map(f)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn with_entry_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut ModuleEntry) -> T,
    ) -> Result<T, RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries
            .iter_mut()
            .find(|e| e.manifest.name == name)
            .map(f)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn module(&self, name: &str) -> Result<Arc<dyn Module>, RegistryError> {
        self.with_entry(name, |e| Arc::clone(&e.module))
    }

    pub fn metadata(&self, name: &str) -> Result<ModuleMetadata, RegistryError> {
        self.with_entry(name, ModuleEntry::metadata)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.with_entry(name, |_| ()).is_ok()
    }

    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.with_entry(name, |e| e.state).ok()
    }

    /// Record a new state; legality is the caller's concern
    pub fn update_state(&self, name: &str, state: ModuleState) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let previous = self.with_entry_mut(name, |e| {
            let previous = e.state;
            e.state = state;
            e.updated_at = now;
            previous
        })?;
        tracing::debug!(module = name, from = %previous, to = %state, "module state changed");
        Ok(())
    }

    /// Move to `next` only if the current state allows it.
    ///
    /// Check and write happen under one lock, so of two racing callers only
    /// one wins. Returns the previous state.
    pub fn transition(&self, name: &str, next: ModuleState) -> Result<ModuleState, RegistryError> {
        let now = self.clock.now();
        let previous = self.with_entry_mut(name, |e| {
            let previous = e.state;
            if !previous.can_transition_to(next) {
                return Err(RegistryError::InvalidTransition {
                    module: name.to_string(),
                    from: previous,
                    to: next,
                });
            }
            e.state = next;
            e.updated_at = now;
            Ok(previous)
        })??;
        tracing::debug!(module = name, from = %previous, to = %next, "module state changed");
        Ok(previous)
    }

    /// Move to `Error`, keeping the message
    pub fn mark_failed(&self, name: &str, message: impl Into<String>) -> Result<(), RegistryError> {
        let message = message.into();
        let now = self.clock.now();
        self.with_entry_mut(name, |e| {
            e.state = ModuleState::Error;
            e.error = Some(message.clone());
            e.updated_at = now;
        })?;
        tracing::warn!(module = name, error = %message, "module failed");
        Ok(())
    }

    pub fn modules(&self) -> Vec<Arc<dyn Module>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|e| Arc::clone(&e.module)).collect()
    }

    pub fn all_metadata(&self) -> Vec<ModuleMetadata> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(ModuleEntry::metadata).collect()
    }

    /// Names of modules currently in `state`
    pub fn modules_by_state(&self, state: ModuleState) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.manifest.name.clone())
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut stats = RegistryStats {
            total: entries.len(),
            ..RegistryStats::default()
        };
        for entry in entries.iter() {
            *stats.by_state.entry(entry.state).or_default() += 1;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every module
    #[cfg(any(test, feature = "test-support"))]
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
