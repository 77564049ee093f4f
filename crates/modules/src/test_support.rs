// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by the module tests

use crate::event_types;
use lifehub_core::{
    Event, EventBus, EventFilter, EventStore, LoaderConfig, Module, ModuleLoader, ModuleRegistry,
    PublishOptions,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Loader over a fresh in-memory bus, with per-module config from JSON
pub fn host(modules: Value) -> ModuleLoader {
    let config = LoaderConfig {
        modules: serde_json::from_value(modules).unwrap(),
        ..LoaderConfig::default()
    };
    ModuleLoader::new(Arc::new(ModuleRegistry::new()), EventBus::in_memory(), config)
}

/// Load the given modules in order, then initialize everything
pub async fn start(loader: &ModuleLoader, modules: Vec<Arc<dyn Module>>) {
    for module in modules {
        loader.load(module).unwrap();
    }
    loader.initialize_all().await.unwrap();
}

pub async fn start_day(loader: &ModuleLoader, date: &str) {
    let event = Event::builder(event_types::DAY_STARTED, "calendar")
        .payload(json!({ "date": date }))
        .build();
    loader
        .bus()
        .publish(event, PublishOptions::default())
        .await
        .unwrap();
}

/// Stored events of one type, oldest first
pub async fn stored(loader: &ModuleLoader, event_type: &str) -> Vec<Event> {
    loader
        .bus()
        .store()
        .query(&EventFilter::new().types([event_type]))
        .await
        .unwrap()
}
