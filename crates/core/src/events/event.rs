// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable event envelope

use crate::clock::{Clock, SystemClock};
use crate::id::{EventId, IdGen, UuidIdGen};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open key-value metadata attached to an event
pub type Metadata = BTreeMap<String, Value>;

/// Metadata key linking an event to the aggregate it describes
pub const AGGREGATE_ID_KEY: &str = "aggregateId";
/// Metadata key grouping events caused by the same request
pub const CORRELATION_ID_KEY: &str = "correlationId";
/// Metadata key naming the user on whose behalf an event was published
pub const USER_ID_KEY: &str = "userId";

/// Schema version assigned when the publisher does not specify one
pub const DEFAULT_EVENT_VERSION: u32 = 1;

/// Something that happened, published by a module.
///
/// Events are immutable once built: fields are only reachable through
/// getters, and the only way to construct one is [`Event::builder`]
/// (or deserializing a stored copy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: EventId,
    #[serde(rename = "type")]
    event_type: String,
    source: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default = "default_version")]
    version: u32,
}

fn default_version() -> u32 {
    DEFAULT_EVENT_VERSION
}

impl Event {
    /// Start building an event of `event_type` published by `source`
    pub fn builder(event_type: impl Into<String>, source: impl Into<String>) -> EventBuilder {
        EventBuilder::new(event_type, source)
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Dot-namespaced type, e.g. `Finance.BudgetCreated`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Name of the publishing module
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Deserialize the payload into a typed value
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Look up a string metadata value
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn aggregate_id(&self) -> Option<&str> {
        self.metadata_str(AGGREGATE_ID_KEY)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata_str(CORRELATION_ID_KEY)
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Builder for [`Event`]
///
/// Id and timestamp are filled in at build time unless set explicitly.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    id: Option<EventId>,
    event_type: String,
    source: String,
    timestamp: Option<DateTime<Utc>>,
    payload: Value,
    metadata: Metadata,
    version: u32,
}

impl EventBuilder {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: event_type.into(),
            source: source.into(),
            timestamp: None,
            payload: Value::Null,
            metadata: Metadata::new(),
            version: DEFAULT_EVENT_VERSION,
        }
    }

    pub fn id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn aggregate_id(self, id: impl Into<String>) -> Self {
        self.metadata(AGGREGATE_ID_KEY, id.into())
    }

    pub fn correlation_id(self, id: impl Into<String>) -> Self {
        self.metadata(CORRELATION_ID_KEY, id.into())
    }

    pub fn user_id(self, id: impl Into<String>) -> Self {
        self.metadata(USER_ID_KEY, id.into())
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Build with a random UUID and the system clock
    pub fn build(self) -> Event {
        self.build_with(&UuidIdGen, &SystemClock)
    }

    /// Build, drawing any missing id or timestamp from the given sources
    pub fn build_with(self, ids: &dyn IdGen, clock: &dyn Clock) -> Event {
        Event {
            id: self.id.unwrap_or_else(|| EventId::generate(ids)),
            event_type: self.event_type,
            source: self.source,
            timestamp: self.timestamp.unwrap_or_else(|| clock.now()),
            payload: self.payload,
            metadata: self.metadata,
            version: self.version,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
