// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::id::SequentialIdGen;
use serde_json::json;

#[test]
fn builder_fills_id_and_timestamp_from_sources() {
    let clock = FakeClock::new();
    let ids = SequentialIdGen::new("evt");

    let event = Event::builder("Task.Created", "tasks")
        .payload(json!({ "title": "water the tomatoes" }))
        .build_with(&ids, &clock);

    assert_eq!(event.id().as_str(), "evt-1");
    assert_eq!(event.timestamp(), clock.now());
    assert_eq!(event.event_type(), "Task.Created");
    assert_eq!(event.source(), "tasks");
    assert_eq!(event.version(), DEFAULT_EVENT_VERSION);
}

#[test]
fn explicit_id_and_timestamp_win() {
    let clock = FakeClock::new();
    let at = clock.now() - chrono::TimeDelta::hours(1);

    let event = Event::builder("Task.Created", "tasks")
        .id("fixed")
        .timestamp(at)
        .build_with(&SequentialIdGen::default(), &clock);

    assert_eq!(event.id().as_str(), "fixed");
    assert_eq!(event.timestamp(), at);
}

#[test]
fn default_build_generates_unique_ids() {
    let a = Event::builder("X", "m").build();
    let b = Event::builder("X", "m").build();
    assert_ne!(a.id(), b.id());
}

#[test]
fn well_known_metadata_accessors() {
    let event = Event::builder("Finance.InvoicePaid", "finance")
        .aggregate_id("invoice-42")
        .correlation_id("req-1")
        .user_id("u-9")
        .metadata("attempt", 2)
        .build();

    assert_eq!(event.aggregate_id(), Some("invoice-42"));
    assert_eq!(event.correlation_id(), Some("req-1"));
    assert_eq!(event.metadata_str(USER_ID_KEY), Some("u-9"));
    assert_eq!(event.metadata().get("attempt"), Some(&json!(2)));
    assert_eq!(event.metadata_str("attempt"), None);
}

#[test]
fn typed_payload_access() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Budget {
        amount: u64,
        currency: String,
    }

    let event = Event::builder("Finance.BudgetCreated", "finance")
        .payload(json!({ "amount": 1200, "currency": "EUR" }))
        .build();

    let budget: Budget = event.payload_as().unwrap();
    assert_eq!(
        budget,
        Budget {
            amount: 1200,
            currency: "EUR".to_string()
        }
    );
}

#[test]
fn serializes_with_type_key() {
    let event = Event::builder("Garden.Planted", "garden")
        .id("evt-1")
        .version(3)
        .build();

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "Garden.Planted");
    assert_eq!(value["source"], "garden");
    assert_eq!(value["version"], 3);

    let back: Event = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}
