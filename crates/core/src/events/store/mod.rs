// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event store
//!
//! The bus forwards every persisted event here. Backends are swappable
//! behind [`EventStore`]:
//! - [`InMemoryEventStore`] - process-local, the default
//! - [`JsonlEventStore`] - one JSON object per line in a file

mod jsonl;
mod memory;

pub use jsonl::JsonlEventStore;
pub use memory::InMemoryEventStore;

use super::event::Event;
use super::subscription::{EventHandler, HandlerError};
use crate::id::EventId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event already stored: {0}")]
    Duplicate(EventId),
    #[error("replay aborted at event {event_id}: {source}")]
    Replay {
        event_id: EventId,
        #[source]
        source: HandlerError,
    },
}

/// Chronological sort direction for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Selects and pages through stored events
///
/// Empty `types`/`sources` lists match everything. `from`/`to` are
/// inclusive bounds on the event timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub types: Vec<String>,
    pub sources: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub order: Order,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Check the selection criteria (not pagination) against an event
    pub fn matches(&self, event: &Event) -> bool {
        (self.types.is_empty() || self.types.iter().any(|t| t == event.event_type()))
            && (self.sources.is_empty() || self.sources.iter().any(|s| s == event.source()))
            && self.from.is_none_or(|from| event.timestamp() >= from)
            && self.to.is_none_or(|to| event.timestamp() <= to)
    }

    /// Select, sort (stable on ties) and paginate a sequence of events
    pub fn apply<'a>(&self, events: impl IntoIterator<Item = &'a Event>) -> Vec<Event> {
        let mut selected: Vec<&Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        match self.order {
            Order::Ascending => selected.sort_by_key(|e| e.timestamp()),
            Order::Descending => selected.sort_by(|a, b| b.timestamp().cmp(&a.timestamp())),
        }

        let page = selected.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).cloned().collect(),
            None => page.cloned().collect(),
        }
    }
}

/// Aggregate numbers over the whole store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStoreStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl EventStoreStats {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.total += 1;
            *stats
                .by_type
                .entry(event.event_type().to_string())
                .or_default() += 1;
            *stats.by_source.entry(event.source().to_string()).or_default() += 1;
            let ts = event.timestamp();
            stats.oldest = Some(stats.oldest.map_or(ts, |o| o.min(ts)));
            stats.newest = Some(stats.newest.map_or(ts, |n| n.max(ts)));
        }
        stats
    }
}

/// Append-only log of published events
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Append an event; stored events are never overwritten
    async fn save(&self, event: &Event) -> Result<(), StoreError>;

    /// Events matching the filter, as owned copies
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError>;

    async fn get_by_id(&self, id: &EventId) -> Result<Option<Event>, StoreError>;

    /// Events whose `aggregateId` metadata equals `aggregate_id`, oldest first
    async fn get_by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError>;

    /// Number of events matching the filter's selection criteria,
    /// ignoring `limit` and `offset`
    async fn count(&self, filter: &EventFilter) -> Result<usize, StoreError>;

    async fn stats(&self) -> Result<EventStoreStats, StoreError>;

    /// Drop every stored event
    async fn clear(&self) -> Result<(), StoreError>;

    /// Re-deliver matching events to `handler`, one at a time, oldest first.
    ///
    /// The first handler error stops the replay and is returned.
    async fn replay(
        &self,
        handler: &dyn EventHandler,
        filter: &EventFilter,
    ) -> Result<usize, StoreError> {
        let filter = filter.clone().order(Order::Ascending);
        let events = self.query(&filter).await?;

        let mut replayed = 0;
        for event in events {
            handler
                .handle(&event)
                .await
                .map_err(|source| StoreError::Replay {
                    event_id: event.id().clone(),
                    source,
                })?;
            replayed += 1;
        }

        tracing::debug!(replayed, "replay complete");
        Ok(replayed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
