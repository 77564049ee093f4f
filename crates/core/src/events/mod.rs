// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events system for loose coupling between modules
//!
//! This module provides:
//! - `Event` - Immutable envelope published by modules
//! - `EventBus` - Route events to matching subscribers using patterns
//! - `EventStore` - Append-only history that can be queried and replayed
//! - `DeadLetterQueue` - Failed handler invocations, kept for inspection

mod bus;
mod dead_letter;
mod event;
pub mod store;
mod subscription;

pub use bus::{BusConfig, BusError, EventBus, PublishOptions, DEFAULT_HANDLER_TIMEOUT};
pub(crate) use bus::panic_message;
pub use dead_letter::{DeadLetter, DeadLetterQueue, HandlerFailure};
pub use event::{
    Event, EventBuilder, Metadata, AGGREGATE_ID_KEY, CORRELATION_ID_KEY, DEFAULT_EVENT_VERSION,
    USER_ID_KEY,
};
pub use store::{
    EventFilter, EventStore, EventStoreStats, InMemoryEventStore, JsonlEventStore, Order,
    StoreError,
};
pub use subscription::{
    handler_fn, EventHandler, EventPattern, FnHandler, HandlerError, Subscription,
    SubscriptionInfo, DEFAULT_PRIORITY,
};
