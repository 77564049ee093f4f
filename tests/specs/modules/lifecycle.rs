//! Dependency-ordered startup and reverse shutdown

use crate::prelude::{loader, owned, Log, Probe};
use lifehub_core::modules::{CallLog, FakeModule};
use lifehub_core::{handler_fn, Event, HandlerError, HandlerSpec, LoaderError, Module};
use serde_json::json;
use similar_asserts::assert_eq;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn dependent_sees_its_dependency_ready_and_wildcard_receives_the_event() {
    let loader = loader();
    let log = Log::default();

    let finance = Arc::new(Probe::new("finance", loader.registry(), &log).requires("core"));
    let received: Arc<Mutex<Vec<Event>>> = Arc::default();
    let sink = Arc::clone(&received);
    let watcher = FakeModule::new("calendar").requires("core").handler(HandlerSpec::new(
        "Finance.*",
        handler_fn(move |event: Event| {
            sink.lock().unwrap().push(event);
            async { Ok::<(), HandlerError>(()) }
        }),
    ));
    loader
        .load(Arc::new(Probe::new("core", loader.registry(), &log)))
        .unwrap();
    loader.load(finance.clone()).unwrap();
    loader.load(Arc::new(watcher)).unwrap();

    loader.initialize_all().await.unwrap();

    let entries = log.entries();
    let position = |entry: &str| entries.iter().position(|e| e == entry).unwrap();
    assert!(position("initialize:core") < position("finance saw core=ready"));
    assert!(position("finance saw core=ready") < position("initialize:finance"));

    let budget = json!({ "month": "2026-11", "amount": 1200.0, "currency": "EUR" });
    finance
        .bus()
        .emit("Finance.BudgetCreated", budget.clone())
        .await
        .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].event_type(), "Finance.BudgetCreated");
    assert_eq!(received[0].source(), "finance");
    assert_eq!(received[0].payload(), &budget);
}

#[tokio::test]
async fn shutdown_reverses_startup_and_survives_failures() {
    let loader = loader();
    let calls = CallLog::default();
    // Registered out of dependency order so startup has to sort them
    for module in [
        FakeModule::new("notes").requires("storage").calls(&calls),
        FakeModule::new("search")
            .requires("notes")
            .fail_shutdown("index still open")
            .calls(&calls),
        FakeModule::new("storage").calls(&calls),
        FakeModule::new("inbox").requires("search").calls(&calls),
    ] {
        let manifest = module.manifest().clone();
        loader.registry().register(Arc::new(module), manifest).unwrap();
    }

    loader.initialize_all().await.unwrap();
    let started = loader.initialization_order();
    assert_eq!(started, owned(&["storage", "notes", "search", "inbox"]));

    calls.lock().unwrap().clear();
    let failures = loader.shutdown_all().await;

    assert!(matches!(
        failures.as_slice(),
        [LoaderError::Shutdown { module, .. }] if module == "search"
    ));
    assert_eq!(
        *calls.lock().unwrap(),
        owned(&[
            "shutdown:inbox",
            "shutdown:search",
            "shutdown:notes",
            "shutdown:storage",
        ])
    );
}

#[tokio::test]
async fn cycles_are_refused_before_anything_starts() {
    let loader = loader();
    let calls = CallLog::default();
    // Registered directly: `load` would reject the first as missing its dependency
    for module in [
        FakeModule::new("alpha").requires("gamma").calls(&calls),
        FakeModule::new("beta").requires("alpha").calls(&calls),
        FakeModule::new("gamma").requires("beta").calls(&calls),
        FakeModule::new("clock").calls(&calls),
    ] {
        let manifest = module.manifest().clone();
        loader.registry().register(Arc::new(module), manifest).unwrap();
    }

    let err = loader.initialize_all().await.unwrap_err();

    assert!(matches!(
        &err,
        LoaderError::CyclicDependency { modules } if *modules == owned(&["alpha", "beta", "gamma"])
    ));
    assert!(calls.lock().unwrap().is_empty());
}
