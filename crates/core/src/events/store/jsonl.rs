// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event store writing one JSON event per line

use super::{EventFilter, EventStore, EventStoreStats, StoreError};
use crate::events::event::Event;
use crate::id::EventId;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct Inner {
    events: Vec<Event>,
    ids: HashSet<EventId>,
}

/// Append-only JSON-lines file, mirrored in memory for queries
pub struct JsonlEventStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonlEventStore {
    /// Open or create a store at the given path, loading existing events
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let events = read_all(&path)?;
        let ids = events.iter().map(|e| e.id().clone()).collect();
        tracing::debug!(path = %path.display(), events = events.len(), "opened event store");

        Ok(Self {
            path,
            inner: Mutex::new(Inner { events, ids }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read events up to the first line that does not parse.
///
/// A crash can leave a torn last line. It is cut off so later appends start
/// on a fresh line; everything before it is kept.
fn read_all(path: &Path) -> Result<Vec<Event>, StoreError> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    let mut line = Vec::new();
    let mut line_number = 0u64;
    let mut valid_len = 0u64;
    let mut missing_newline = false;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let text = line.trim_ascii();
        if !text.is_empty() {
            match serde_json::from_slice::<Event>(text) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = line_number,
                        error = %e,
                        kept = events.len(),
                        "ignoring unreadable tail of event log"
                    );
                    cut_tail(path, valid_len)?;
                    return Ok(events);
                }
            }
        }
        valid_len += read as u64;
        missing_newline = line.last() != Some(&b'\n');
    }

    if missing_newline {
        OpenOptions::new().append(true).open(path)?.write_all(b"\n")?;
    }
    Ok(events)
}

fn cut_tail(path: &Path, valid_len: u64) -> Result<(), StoreError> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(valid_len)?;
    file.sync_all()?;
    Ok(())
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn save(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.ids.contains(event.id()) {
            return Err(StoreError::Duplicate(event.id().clone()));
        }

        let json = serde_json::to_string(event)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        inner.ids.insert(event.id().clone());
        inner.events.push(event.clone());
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(filter.apply(&inner.events))
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.events.iter().find(|e| e.id() == id).cloned())
    }

    async fn get_by_aggregate_id(&self, aggregate_id: &str) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
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
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.events.iter().filter(|e| filter.matches(e)).count())
    }

    async fn stats(&self) -> Result<EventStoreStats, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(EventStoreStats::from_events(&inner.events))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        File::create(&self.path)?;
        inner.events.clear();
        inner.ids.clear();
        Ok(())
    }
}
