//! lifehub-core: Module plugin system and event bus for the lifehub host
//!
//! This crate provides:
//! - An immutable event envelope and a pattern-routed event bus with
//!   priorities, timeouts and a dead-letter queue
//! - Swappable event stores (in-memory, JSON lines) with query and replay
//! - The module contract, manifests, a lifecycle registry and a
//!   dependency-ordered loader

pub mod clock;
pub mod id;

pub mod events;
pub mod modules;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{EventId, IdGen, SequentialIdGen, SubscriptionId, UuidIdGen};

pub use events::{
    handler_fn, BusConfig, BusError, DeadLetter, Event, EventBuilder, EventBus, EventFilter,
    EventHandler, EventPattern, EventStore, EventStoreStats, HandlerError, HandlerFailure,
    InMemoryEventStore, JsonlEventStore, Order, PublishOptions, StoreError, SubscriptionInfo,
};
pub use modules::{
    DatabaseHandle, HandlerSpec, HealthReport, HealthStatus, LoadErrors, LoaderConfig,
    LoaderError, Module, ModuleCatalog, ModuleConfig, ModuleContext, ModuleError,
    ModuleEventBus, ModuleLoader, ModuleLogger, ModuleManifest, ModuleRegistry, ModuleState,
    Permission, RegistryError,
};
