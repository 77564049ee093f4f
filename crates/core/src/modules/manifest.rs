// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module manifests: the declarative half of a module.
//!
//! A manifest names the module, pins its version, lists the capabilities it
//! asks for and the modules it needs. Manifests are JSON documents with
//! camelCase keys:
//!
//! ```json
//! {
//!   "name": "finance",
//!   "version": "1.2.0",
//!   "permissions": ["notifications.send"],
//!   "dependencies": { "core": "^1.0" },
//!   "events": { "publishes": ["Finance.BudgetCreated"] }
//! }
//! ```

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Capability a module may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "calendar.read")]
    CalendarRead,
    #[serde(rename = "calendar.write")]
    CalendarWrite,
    #[serde(rename = "email.read")]
    EmailRead,
    #[serde(rename = "notifications.send")]
    NotificationsSend,
    #[serde(rename = "filesystem.read")]
    FilesystemRead,
    #[serde(rename = "filesystem.write")]
    FilesystemWrite,
    #[serde(rename = "network.access")]
    NetworkAccess,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::CalendarRead,
        Permission::CalendarWrite,
        Permission::EmailRead,
        Permission::NotificationsSend,
        Permission::FilesystemRead,
        Permission::FilesystemWrite,
        Permission::NetworkAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CalendarRead => "calendar.read",
            Permission::CalendarWrite => "calendar.write",
            Permission::EmailRead => "email.read",
            Permission::NotificationsSend => "notifications.send",
            Permission::FilesystemRead => "filesystem.read",
            Permission::FilesystemWrite => "filesystem.write",
            Permission::NetworkAccess => "network.access",
        }
    }

    /// Whether the permission implies access to persistent storage
    pub fn is_storage(&self) -> bool {
        matches!(self, Permission::FilesystemRead | Permission::FilesystemWrite)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event types a module says it consumes and produces.
///
/// Advisory only: nothing checks a publish against `publishes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDeclarations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publishes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest name must not be empty")]
    EmptyName,
    #[error("module '{0}' lists itself as a dependency")]
    SelfDependency(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
    /// Module name to the version range it must satisfy
    #[serde(default)]
    pub dependencies: BTreeMap<String, VersionReq>,
    #[serde(default)]
    pub events: EventDeclarations,
}

impl ModuleManifest {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            author: String::new(),
            permissions: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            events: EventDeclarations::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>, requirement: VersionReq) -> Self {
        self.dependencies.insert(name.into(), requirement);
        self
    }

    pub fn subscribes(mut self, event_type: impl Into<String>) -> Self {
        self.events.subscribes.push(event_type.into());
        self
    }

    pub fn publishes(mut self, event_type: impl Into<String>) -> Self {
        self.events.publishes.push(event_type.into());
        self
    }

    /// Parse and validate a manifest from JSON text
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks that do not depend on other modules
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }
        if self.dependencies.contains_key(&self.name) {
            return Err(ManifestError::SelfDependency(self.name.clone()));
        }
        Ok(())
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// True when the module asked for filesystem read or write access
    pub fn grants_storage(&self) -> bool {
        self.permissions.iter().any(Permission::is_storage)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
