//! Replay order of the event stores

use crate::prelude::{owned, Log};
use chrono::{DateTime, TimeDelta, Utc};
use lifehub_core::{Event, EventFilter, EventStore, InMemoryEventStore, JsonlEventStore};
use similar_asserts::assert_eq;

fn at(id: &str, minutes: i64) -> Event {
    Event::builder("Journal.Entry", "journal")
        .id(id)
        .timestamp(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(minutes))
        .build()
}

async fn replay_order(store: &dyn EventStore) -> Vec<String> {
    for event in [at("c", 30), at("a", 10), at("d", 40), at("b", 20)] {
        store.save(&event).await.unwrap();
    }
    let log = Log::default();
    let sink = log.clone();
    let handler = lifehub_core::handler_fn(move |event: Event| {
        sink.push(event.id().to_string());
        async { Ok::<(), lifehub_core::HandlerError>(()) }
    });
    let replayed = store.replay(handler.as_ref(), &EventFilter::new()).await.unwrap();
    assert_eq!(replayed, 4);
    log.entries()
}

#[tokio::test]
async fn memory_store_replays_by_timestamp() {
    let store = InMemoryEventStore::new();
    assert_eq!(replay_order(&store).await, owned(&["a", "b", "c", "d"]));
}

#[tokio::test]
async fn jsonl_store_replays_by_timestamp() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = JsonlEventStore::open(tmp.path().join("events.jsonl")).unwrap();
    assert_eq!(replay_order(&store).await, owned(&["a", "b", "c", "d"]));
}
