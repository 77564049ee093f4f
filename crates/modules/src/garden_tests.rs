// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{host, start, start_day, stored};
use crate::{CalendarModule, CoreModule};
use lifehub_core::ModuleLoader;

async fn start_garden(loader: &ModuleLoader) -> (Arc<GardenModule>, Arc<CalendarModule>) {
    let garden = Arc::new(GardenModule::new().unwrap());
    let calendar = Arc::new(CalendarModule::new().unwrap());
    start(
        loader,
        vec![CoreModule::create().unwrap(), calendar.clone(), garden.clone()],
    )
    .await;
    (garden, calendar)
}

#[tokio::test]
async fn each_day_asks_for_watering_per_plant() {
    let loader = host(json!({ "garden": { "plants": ["basil", "tomato"] } }));
    let (_, calendar) = start_garden(&loader).await;

    start_day(&loader, "2031-06-15").await;

    let due = stored(&loader, event_types::WATERING_DUE).await;
    let plants: Vec<&str> = due
        .iter()
        .filter_map(|e| e.payload()["plant"].as_str())
        .collect();
    assert_eq!(plants, vec!["basil", "tomato"]);
    assert!(due.iter().all(|e| e.payload()["date"] == "2031-06-15"));
    assert!(due.iter().all(|e| e.source() == "garden"));

    let titles: Vec<String> = calendar.reminders().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["Water the basil", "Water the tomato"]);
}

#[tokio::test]
async fn health_reports_the_plant_count() {
    let loader = host(json!({ "garden": { "plants": ["fern"] } }));
    let (garden, _) = start_garden(&loader).await;

    let health = garden.health_check().await.unwrap();
    assert!(health.healthy);
    assert_eq!(health.message.as_deref(), Some("watering 1 plant(s)"));
}

#[tokio::test]
async fn empty_garden_stays_quiet() {
    let loader = host(json!({}));
    let (garden, _) = start_garden(&loader).await;

    start_day(&loader, "2031-06-15").await;

    assert!(stored(&loader, event_types::WATERING_DUE).await.is_empty());
    assert_eq!(
        garden.health_check().await.and_then(|h| h.message).as_deref(),
        Some("no plants configured")
    );
}
