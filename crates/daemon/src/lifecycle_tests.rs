// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lifehub_core::{EventFilter, ModuleState};
use lifehub_modules::{catalog, event_types};
use tempfile::TempDir;

fn config(tmp: &TempDir, extra: &str) -> HubConfig {
    let text = format!("data_dir = {:?}\n{extra}", tmp.path().display().to_string());
    HubConfig::parse(&text).unwrap()
}

#[tokio::test]
async fn starts_and_stops_every_module() {
    let tmp = TempDir::new().unwrap();
    let hub = startup(&config(&tmp, ""), catalog()).await.unwrap();

    assert_eq!(
        hub.loader().initialization_order().first().map(String::as_str),
        Some("core")
    );
    let report = hub.health().await;
    assert_eq!(report.len(), 4);
    assert!(report.is_healthy(), "{report:?}");

    assert!(hub.shutdown().await.is_empty());
    let registry = hub.loader().registry();
    assert_eq!(registry.modules_by_state(ModuleState::Shutdown).len(), 4);
}

#[tokio::test]
async fn disabled_modules_are_not_loaded() {
    let tmp = TempDir::new().unwrap();
    let hub = startup(&config(&tmp, "disabled = [\"garden\"]"), catalog())
        .await
        .unwrap();

    assert!(!hub.loader().registry().has_module("garden"));
    assert!(hub.health().await.is_healthy());
}

#[tokio::test]
async fn failed_module_keeps_the_rest_running() {
    let tmp = TempDir::new().unwrap();
    let extra = "[modules.finance]\nmonthly_budget = \"lots\"";
    let hub = startup(&config(&tmp, extra), catalog()).await.unwrap();

    let registry = hub.loader().registry();
    assert_eq!(registry.state("core"), Some(ModuleState::Ready));
    assert_eq!(registry.state("calendar"), Some(ModuleState::Ready));
    assert_eq!(registry.state("finance"), Some(ModuleState::Error));

    let report = hub.health().await;
    assert!(!report.is_healthy());
    assert!(report.unhealthy().contains(&"finance"));
}

#[tokio::test]
async fn jsonl_store_persists_events_in_the_data_dir() {
    let tmp = TempDir::new().unwrap();
    let hub = startup(&config(&tmp, "[store]\nkind = \"jsonl\""), catalog())
        .await
        .unwrap();
    hub.shutdown().await;

    let reopened = JsonlEventStore::open(tmp.path().join("events.jsonl")).unwrap();
    let started = reopened
        .query(&EventFilter::new().types([event_types::CORE_STARTED]))
        .await
        .unwrap();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].source(), "core");
}

#[tokio::test]
async fn finance_ledger_lands_in_the_data_dir() {
    let tmp = TempDir::new().unwrap();
    let extra = "[modules.finance]\nmonthly_budget = 300";
    let hub = startup(&config(&tmp, extra), catalog()).await.unwrap();
    hub.shutdown().await;

    let ledger = tmp.path().join("finance").join("budgets.jsonl");
    assert_eq!(std::fs::read_to_string(ledger).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn storage_handle_requires_a_configured_data_dir() {
    let bare = HubConfig::parse("[modules.finance]\nmonthly_budget = 300").unwrap();
    let hub = startup(&bare, catalog()).await.unwrap();
    assert!(hub.loader().database().is_none());
    assert!(hub.health().await.is_healthy());
    hub.shutdown().await;

    let tmp = TempDir::new().unwrap();
    let hub = startup(&config(&tmp, ""), catalog()).await.unwrap();
    let dir = hub
        .loader()
        .database()
        .and_then(|db| db.downcast_ref::<DataDir>())
        .map(|dir| dir.0.clone());
    assert_eq!(dir, Some(tmp.path().to_path_buf()));
    hub.shutdown().await;
}
