// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host configuration read from `lifehub.toml`
//!
//! ```toml
//! log_path = "/var/log/lifehub/lifehubd.log"
//! data_dir = "/var/lib/lifehub"
//! disabled = ["garden"]
//!
//! [bus]
//! handler_timeout = "30s"
//!
//! [store]
//! kind = "jsonl"
//! path = "/var/lib/lifehub/events.jsonl"
//!
//! [loader]
//! health_timeout = "5s"
//!
//! [modules.finance]
//! monthly_budget = 1200
//! ```

use lifehub_core::{BusConfig, LoaderConfig, ModuleConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "lifehub.toml";
const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where events are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum StoreConfig {
    /// Lost on exit
    #[default]
    Memory,
    /// Append-only JSON lines; `path` defaults to `events.jsonl` in the data dir
    Jsonl { path: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSection {
    #[serde(with = "humantime_serde", default = "default_health_timeout")]
    pub health_timeout: Duration,
}

fn default_health_timeout() -> Duration {
    LoaderConfig::default().health_timeout
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            health_timeout: default_health_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    pub bus: BusConfig,
    pub store: StoreConfig,
    pub loader: LoaderSection,
    /// Settings handed to each module, keyed by module name
    pub modules: BTreeMap<String, ModuleConfig>,
    /// Modules left out of the catalog
    pub disabled: Vec<String>,
    /// Also log to this file
    pub log_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl HubConfig {
    /// Load from `explicit`, else from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path, true),
            None => match default_path() {
                Some(path) => Self::read(&path, false),
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if required {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            health_timeout: self.loader.health_timeout,
            modules: self.modules.clone(),
        }
    }

    /// Directory handed to filesystem modules; only when configured
    pub fn storage_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// File backing a `jsonl` store.
    ///
    /// Without a configured data dir the event log goes under the platform
    /// data dir.
    pub fn events_path(&self) -> Option<PathBuf> {
        match &self.store {
            StoreConfig::Memory => None,
            StoreConfig::Jsonl { path: Some(path) } => Some(path.clone()),
            StoreConfig::Jsonl { path: None } => self
                .data_dir
                .clone()
                .or_else(|| dirs::data_dir().map(|dir| dir.join("lifehub")))
                .map(|dir| dir.join(EVENTS_FILE)),
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lifehub").join(CONFIG_FILE))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
