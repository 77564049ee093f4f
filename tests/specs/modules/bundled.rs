//! The bundled modules cooperating over one bus

use crate::prelude::owned;
use lifehub_core::{
    Event, EventBus, EventFilter, EventStore, LoaderConfig, ModuleLoader, ModuleRegistry,
    PublishOptions,
};
use lifehub_modules::{catalog, event_types};
use serde_json::json;
use similar_asserts::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn first_of_the_month_produces_budget_and_watering_reminders() {
    let config: LoaderConfig = serde_json::from_value(json!({
        "modules": {
            "finance": { "monthly_budget": 900, "currency": "EUR" },
            "garden": { "plants": ["basil"] },
        }
    }))
    .unwrap();
    let loader = ModuleLoader::new(Arc::new(ModuleRegistry::new()), EventBus::in_memory(), config);
    loader.load_all(&catalog()).unwrap();
    loader.initialize_all().await.unwrap();
    let store = loader.bus().store();
    store.clear().await.unwrap();

    let day = Event::builder(event_types::DAY_STARTED, "calendar")
        .payload(json!({ "date": "2031-06-01" }))
        .build();
    loader
        .bus()
        .publish(day, PublishOptions::default())
        .await
        .unwrap();

    let reminders = store
        .query(&EventFilter::new().types([event_types::REMINDER_CREATED]))
        .await
        .unwrap();
    let mut titles: Vec<String> = reminders
        .iter()
        .filter_map(|e| e.payload()["title"].as_str().map(str::to_string))
        .collect();
    titles.sort();
    assert_eq!(
        titles,
        owned(&["Review the 2031-06 budget", "Water the basil"])
    );
    assert!(loader.bus().dead_letters().is_empty());
    assert!(loader.health_check().await.is_healthy());
}
