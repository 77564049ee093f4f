// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory event store

use super::{EventFilter, EventStore, EventStoreStats, StoreError};
use crate::events::event::Event;
use crate::id::EventId;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    events: Vec<Event>,
    ids: HashSet<EventId>,
}

/// Process-local event store backed by a vector
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.ids.insert(event.id().clone()) {
            return Err(StoreError::Duplicate(event.id().clone()));
        }
        inner.events.push(event.clone());
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(filter.apply(&inner.events))
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.events.iter().find(|e| e.id() == id).cloned())
    }

    async fn get_by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut events: Vec<Event> = inner
            .events
            .iter()
            .filter(|e| e.aggregate_id() == Some(aggregate_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp());
        Ok(events)
    }

    async fn count(&self, filter: &EventFilter) -> Result<usize, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.events.iter().filter(|e| filter.matches(e)).count())
    }

    async fn stats(&self) -> Result<EventStoreStats, StoreError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(EventStoreStats::from_events(&inner.events))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.events.clear();
        inner.ids.clear();
        Ok(())
    }
}
