// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module plugin system
//!
//! - `ModuleManifest` - Declarative description of a module
//! - `Module` - Lifecycle contract implemented by feature modules
//! - `ModuleRegistry` - Name to instance, manifest and state
//! - `ModuleLoader` - Dependency-ordered startup, shutdown and health

mod context;
#[cfg(any(test, feature = "test-support"))]
mod fake;
mod loader;
mod manifest;
mod module;
mod registry;

pub use context::{DatabaseHandle, ModuleConfig, ModuleContext, ModuleEventBus, ModuleLogger};
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CallLog, FakeModule};
pub use loader::{
    HealthReport, LoadErrors, LoaderConfig, LoaderError, ModuleCatalog, ModuleDescriptor,
    ModuleFactory, ModuleLoader, DEFAULT_HEALTH_TIMEOUT,
};
pub use manifest::{EventDeclarations, ManifestError, ModuleManifest, Permission};
pub use module::{HandlerSpec, HealthStatus, Module, ModuleError};
pub use registry::{ModuleMetadata, ModuleRegistry, ModuleState, RegistryError, RegistryStats};
