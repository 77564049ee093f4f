// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event pattern matching and subscriptions

use super::event::Event;
use crate::id::SubscriptionId;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Priority given to subscriptions that do not ask for one
pub const DEFAULT_PRIORITY: i32 = 0;

/// Pattern for matching event types
/// Supports:
///   - Everything: "*"
///   - Exact: "Task.Created"
///   - Segment wildcard: "Task.*" matches "Task.Created", "Task.Deleted"
///   - In-segment wildcard: "Finance.Budget*" matches "Finance.BudgetCreated"
///
/// Segments are separated by `.`; a `*` never matches across a dot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_string())
    }

    /// Check if this pattern matches an event type
    pub fn matches(&self, event_type: &str) -> bool {
        // Empty pattern matches nothing
        if self.0.is_empty() {
            return false;
        }

        if self.0 == "*" || self.0 == event_type {
            return true;
        }

        if !self.is_wildcard() {
            return false;
        }

        let pattern_parts: Vec<&str> = self.0.split('.').collect();
        let event_parts: Vec<&str> = event_type.split('.').collect();

        Self::match_segments(&pattern_parts, &event_parts)
    }

    fn match_segments(pattern: &[&str], event: &[&str]) -> bool {
        match (pattern.split_first(), event.split_first()) {
            (None, None) => true,
            // * matches exactly one segment
            (Some((&"*", pattern_rest)), Some((_, event_rest))) => {
                Self::match_segments(pattern_rest, event_rest)
            }
            (Some((p, pattern_rest)), Some((e, event_rest))) if Self::match_segment(p, e) => {
                Self::match_segments(pattern_rest, event_rest)
            }
            _ => false,
        }
    }

    /// Match one segment where `*` stands for any run of characters
    fn match_segment(pattern: &str, segment: &str) -> bool {
        let mut parts = pattern.split('*');
        let Some(first) = parts.next() else {
            return segment.is_empty();
        };
        let Some(mut remaining) = segment.strip_prefix(first) else {
            return false;
        };

        let rest: Vec<&str> = parts.collect();
        let Some((last, middle)) = rest.split_last() else {
            // No `*` in this segment
            return remaining.is_empty();
        };

        for part in middle {
            match remaining.find(part) {
                Some(index) => remaining = &remaining[index + part.len()..],
                None => return false,
            }
        }

        remaining.ends_with(last)
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.contains('*')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Error returned by an event handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives events delivered by the bus or replayed from the store
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into an [`EventHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.0)(event.clone()).await
    }
}

/// Wrap an async closure as a shareable handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// A handler registered on the bus for one pattern
#[derive(Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub pattern: EventPattern,
    /// Name of the module that owns this subscription
    pub subscriber: String,
    pub priority: i32,
    pub handler: Arc<dyn EventHandler>,
    /// Registration order, used to break priority ties
    pub(crate) sequence: u64,
}

impl Subscription {
    /// Check if the pattern matches the event type
    pub fn matches(&self, event_type: &str) -> bool {
        self.pattern.matches(event_type)
    }

    pub fn info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id.clone(),
            pattern: self.pattern.as_str().to_string(),
            subscriber: self.subscriber.clone(),
            priority: self.priority,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("subscriber", &self.subscriber)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Handler-free view of a subscription for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub pattern: String,
    pub subscriber: String,
    pub priority: i32,
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
