//! Routing, ordering and persistence of published events

use crate::prelude::{owned, Log};
use lifehub_core::{Event, EventBus, EventFilter, PublishOptions};
use similar_asserts::assert_eq;

#[tokio::test]
async fn higher_priority_side_effects_happen_first() {
    let bus = EventBus::in_memory();
    let log = Log::default();
    bus.subscribe("X", log.recorder("priority 1"), "low", 1).unwrap();
    bus.subscribe("X", log.recorder("priority 10"), "high", 10).unwrap();

    bus.publish(Event::builder("X", "test").build(), PublishOptions::default())
        .await
        .unwrap();

    assert_eq!(log.entries(), owned(&["priority 10", "priority 1"]));
}

#[tokio::test]
async fn ties_keep_registration_order_across_patterns() {
    let bus = EventBus::in_memory();
    let log = Log::default();
    bus.subscribe("Task.Created", log.recorder("5 first"), "a", 5).unwrap();
    bus.subscribe("*", log.recorder("1"), "b", 1).unwrap();
    bus.subscribe("Task.*", log.recorder("5 second"), "c", 5).unwrap();
    bus.subscribe("Task.Created", log.recorder("0"), "d", 0).unwrap();

    bus.publish(
        Event::builder("Task.Created", "tasks").build(),
        PublishOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(log.entries(), owned(&["5 first", "5 second", "1", "0"]));
}

#[tokio::test]
async fn wildcards_match_one_namespace_segment() {
    let bus = EventBus::in_memory();
    let log = Log::default();
    bus.subscribe("Task.*", log.recorder("task"), "t", 0).unwrap();

    for event_type in ["Task.Created", "TaskCreated", "Task.Created.Late", "Garden.Planted"] {
        bus.publish(
            Event::builder(event_type, "test").build(),
            PublishOptions::default(),
        )
        .await
        .unwrap();
    }

    assert_eq!(log.entries(), owned(&["task"]));
}

#[tokio::test]
async fn unsubscribed_handlers_stop_firing() {
    let bus = EventBus::in_memory();
    let log = Log::default();
    let id = bus.subscribe("X", log.recorder("x"), "m", 0).unwrap();

    assert!(bus.unsubscribe(&id));
    assert!(!bus.unsubscribe(&id));
    bus.publish(Event::builder("X", "test").build(), PublishOptions::default())
        .await
        .unwrap();

    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn only_persisted_events_are_queryable() {
    let bus = EventBus::in_memory();
    let kept = Event::builder("Note.Saved", "notes").build();
    let dropped = Event::builder("Note.Typed", "notes").build();
    let kept_id = kept.id().clone();

    bus.publish(kept, PublishOptions::default()).await.unwrap();
    bus.publish(dropped, PublishOptions::default().transient())
        .await
        .unwrap();

    let stored = bus.store().query(&EventFilter::new()).await.unwrap();
    let ids: Vec<_> = stored.iter().map(|e| e.id().clone()).collect();
    assert_eq!(ids, vec![kept_id]);
}
