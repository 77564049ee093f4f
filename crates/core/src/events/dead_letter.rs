// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record of events whose handlers failed

use super::event::Event;
use crate::id::SubscriptionId;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Why a handler invocation failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerFailure {
    #[error("handler returned an error: {0}")]
    Error(String),
    #[error("handler panicked: {0}")]
    Panic(String),
    #[error("handler timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
}

/// An event paired with the failure of one of its handlers
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: Event,
    pub error: HandlerFailure,
    pub subscription_id: SubscriptionId,
    pub subscriber: String,
    pub failed_at: DateTime<Utc>,
}

/// Append-only queue of dead letters, shared between bus clones
#[derive(Debug, Clone, Default)]
pub struct DeadLetterQueue {
    entries: Arc<Mutex<Vec<DeadLetter>>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, letter: DeadLetter) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(letter);
    }

    /// Copy of the current entries, oldest first
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
