// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for routing events to subscribers

use super::dead_letter::{DeadLetter, DeadLetterQueue, HandlerFailure};
use super::event::{Event, EventBuilder};
use super::store::{EventStore, InMemoryEventStore, StoreError};
use super::subscription::{EventHandler, EventPattern, Subscription, SubscriptionInfo};
use crate::clock::{Clock, SystemClock};
use crate::id::{IdGen, SubscriptionId, UuidIdGen};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// How long a handler may run before it is abandoned
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(with = "humantime_serde", default = "default_handler_timeout")]
    pub handler_timeout: Duration,
}

fn default_handler_timeout() -> Duration {
    DEFAULT_HANDLER_TIMEOUT
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

/// Per-call publish behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Append the event to the store before dispatching
    pub persist: bool,
    /// Wait for every handler to finish (or time out) before returning
    pub wait_for_handlers: bool,
    /// Overrides [`BusConfig::handler_timeout`] for this call
    pub timeout: Option<Duration>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            persist: true,
            wait_for_handlers: true,
            timeout: None,
        }
    }
}

impl PublishOptions {
    pub fn transient(self) -> Self {
        Self {
            persist: false,
            ..self
        }
    }

    pub fn detached(self) -> Self {
        Self {
            wait_for_handlers: false,
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("subscription pattern must not be empty")]
    EmptyPattern,
    #[error("event store error: {0}")]
    Store(#[from] StoreError),
}

/// Subscriptions grouped by their exact pattern string
#[derive(Default)]
struct Subscriptions {
    by_pattern: HashMap<String, Vec<Subscription>>,
    next_sequence: u64,
}

/// The event bus routes events to matching subscribers.
///
/// Clones share subscriptions, dead letters and the store.
#[derive(Clone)]
pub struct EventBus {
    subscriptions: Arc<RwLock<Subscriptions>>,
    dead_letters: DeadLetterQueue,
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    config: BusConfig,
}

impl EventBus {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(Subscriptions::default())),
            dead_letters: DeadLetterQueue::new(),
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGen),
            config: BusConfig::default(),
        }
    }

    /// Bus backed by a fresh [`InMemoryEventStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEventStore::new()))
    }

    pub fn with_config(self, config: BusConfig) -> Self {
        Self { config, ..self }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    pub fn with_id_gen(self, ids: Arc<dyn IdGen>) -> Self {
        Self { ids, ..self }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Build an event with the bus's id generator and clock
    pub fn stamp(&self, builder: EventBuilder) -> Event {
        builder.build_with(self.ids.as_ref(), self.clock.as_ref())
    }

    /// Register `handler` for events matching `pattern`.
    ///
    /// Within one pattern, handlers run highest priority first; equal
    /// priorities keep registration order.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
        subscriber: &str,
        priority: i32,
    ) -> Result<SubscriptionId, BusError> {
        if pattern.is_empty() {
            return Err(BusError::EmptyPattern);
        }

        let id = SubscriptionId::generate(self.ids.as_ref());
        let mut subs = self.subscriptions.write().unwrap_or_else(|e| e.into_inner());
        let sequence = subs.next_sequence;
        subs.next_sequence += 1;

        let list = subs.by_pattern.entry(pattern.to_string()).or_default();
        let position = list
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(list.len());
        list.insert(
            position,
            Subscription {
                id: id.clone(),
                pattern: EventPattern::new(pattern),
                subscriber: subscriber.to_string(),
                priority,
                handler,
                sequence,
            },
        );

        tracing::debug!(pattern, subscriber, priority, subscription = %id, "subscribed");
        Ok(id)
    }

    /// Remove a subscription; returns false if it was not registered
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().unwrap_or_else(|e| e.into_inner());

        let found = subs.by_pattern.iter_mut().find_map(|(pattern, list)| {
            let index = list.iter().position(|s| &s.id == id)?;
            list.remove(index);
            Some((pattern.clone(), list.is_empty()))
        });

        match found {
            Some((pattern, now_empty)) => {
                if now_empty {
                    subs.by_pattern.remove(&pattern);
                }
                tracing::debug!(subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Remove every subscription owned by `subscriber`
    pub fn unsubscribe_subscriber(&self, subscriber: &str) -> usize {
        let mut subs = self.subscriptions.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        for list in subs.by_pattern.values_mut() {
            let before = list.len();
            list.retain(|s| s.subscriber != subscriber);
            removed += before - list.len();
        }
        subs.by_pattern.retain(|_, list| !list.is_empty());

        if removed > 0 {
            tracing::debug!(subscriber, removed, "removed subscriber");
        }
        removed
    }

    /// Subscriptions matching `event_type` in invocation order
    fn matching(&self, event_type: &str) -> Vec<Subscription> {
        let subs = self.subscriptions.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<Subscription> = subs
            .by_pattern
            .values()
            .flatten()
            .filter(|s| s.matches(event_type))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.sequence.cmp(&b.sequence))
        });
        matched
    }

    /// Publish an event to all matching subscribers.
    ///
    /// Handler errors, panics and timeouts are recorded as dead letters and
    /// never returned; only a failed store write is.
    pub async fn publish(&self, event: Event, options: PublishOptions) -> Result<(), BusError> {
        if options.persist {
            self.store.save(&event).await?;
        }

        let subscriptions = self.matching(event.event_type());
        if subscriptions.is_empty() {
            tracing::trace!(event_type = event.event_type(), "no subscribers");
            return Ok(());
        }

        let timeout = options.timeout.unwrap_or(self.config.handler_timeout);
        let dispatch = Dispatch {
            event: Arc::new(event),
            timeout,
            dead_letters: self.dead_letters.clone(),
            clock: Arc::clone(&self.clock),
        };

        if options.wait_for_handlers {
            dispatch.run(subscriptions).await;
        } else {
            tokio::spawn(dispatch.run(subscriptions));
        }
        Ok(())
    }

    /// Copy of the dead-letter queue, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.snapshot()
    }

    pub fn clear_dead_letters(&self) -> usize {
        self.dead_letters.clear()
    }

    /// Every registered subscription in registration order
    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        let subs = self.subscriptions.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<&Subscription> = subs.by_pattern.values().flatten().collect();
        all.sort_by_key(|s| s.sequence);
        all.into_iter().map(Subscription::info).collect()
    }

    /// Number of subscriptions that would receive an event of `event_type`
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        let subs = self.subscriptions.read().unwrap_or_else(|e| e.into_inner());
        subs.by_pattern
            .values()
            .flatten()
            .filter(|s| s.matches(event_type))
            .count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// One event on its way through the matched handlers
struct Dispatch {
    event: Arc<Event>,
    timeout: Duration,
    dead_letters: DeadLetterQueue,
    clock: Arc<dyn Clock>,
}

impl Dispatch {
    async fn run(self, subscriptions: Vec<Subscription>) {
        for subscription in subscriptions {
            if let Err(failure) = self.invoke(&subscription).await {
                tracing::error!(
                    event_type = self.event.event_type(),
                    event_id = %self.event.id(),
                    subscriber = %subscription.subscriber,
                    subscription = %subscription.id,
                    error = %failure,
                    "event handler failed"
                );
                self.dead_letters.push(DeadLetter {
                    event: Event::clone(&self.event),
                    error: failure,
                    subscription_id: subscription.id.clone(),
                    subscriber: subscription.subscriber.clone(),
                    failed_at: self.clock.now(),
                });
            }
        }
    }

    /// Run one handler on its own task so a panic or a timeout stays local
    async fn invoke(&self, subscription: &Subscription) -> Result<(), HandlerFailure> {
        let handler = Arc::clone(&subscription.handler);
        let event = Arc::clone(&self.event);
        let mut task =
            tokio::spawn(async move { handler.handle(&event).await.map_err(|e| e.to_string()) });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(HandlerFailure::Error(message)),
            Ok(Err(join_error)) => Err(HandlerFailure::Panic(panic_message(join_error))),
            Err(_) => {
                // Cancels at the handler's next await point
                task.abort();
                Err(HandlerFailure::Timeout(self.timeout))
            }
        }
    }
}

pub(crate) fn panic_message(error: tokio::task::JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(error) => error.to_string(),
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
