// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_gen_creates_unique_ids() {
    let id_gen = UuidIdGen;
    let id1 = EventId::generate(&id_gen);
    let id2 = EventId::generate(&id_gen);
    assert_ne!(id1, id2);
    assert_eq!(id1.as_str().len(), 36); // UUID format
}

#[test]
fn sequential_gen_creates_predictable_ids() {
    let id_gen = SequentialIdGen::new("sub");
    assert_eq!(id_gen.next(), "sub-1");
    assert_eq!(id_gen.next(), "sub-2");
    assert_eq!(SubscriptionId::generate(&id_gen), SubscriptionId::from("sub-3"));
}

#[test]
fn sequential_gen_clones_share_the_counter() {
    let id_gen1 = SequentialIdGen::new("shared");
    let id_gen2 = id_gen1.clone();
    assert_eq!(id_gen1.next(), "shared-1");
    assert_eq!(id_gen2.next(), "shared-2");
    assert_eq!(id_gen1.next(), "shared-3");
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = EventId::new("evt-7");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"evt-7\"");
    assert_eq!(id.to_string(), "evt-7");
}
