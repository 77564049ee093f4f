// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `calendar` module: announces each day and keeps reminders

use crate::{bus, event_types, DayStarted};
use async_trait::async_trait;
use chrono::Utc;
use lifehub_core::{
    handler_fn, BusError, Event, HandlerError, HandlerSpec, HealthStatus, Module, ModuleContext,
    ModuleError, ModuleEventBus, ModuleManifest,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

const MANIFEST: &str = include_str!("manifests/calendar.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    /// Id of the event the reminder was created from
    pub source_event: String,
}

#[derive(Default)]
struct Agenda {
    bus: OnceLock<ModuleEventBus>,
    reminders: Mutex<Vec<Reminder>>,
}

impl Agenda {
    async fn remind(&self, event: &Event) -> Result<(), ModuleError> {
        let reminder = Reminder {
            title: reminder_title(event),
            source_event: event.id().to_string(),
        };
        self.reminders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reminder.clone());

        let payload =
            serde_json::to_value(&reminder).map_err(|e| ModuleError::failed(e.to_string()))?;
        bus(&self.bus)?
            .emit(event_types::REMINDER_CREATED, payload)
            .await?;
        Ok(())
    }
}

fn reminder_title(event: &Event) -> String {
    let field = |key: &str| {
        event
            .payload()
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    match event.event_type() {
        event_types::BUDGET_CREATED => match field("month") {
            Some(month) => format!("Review the {month} budget"),
            None => "Review the budget".to_string(),
        },
        event_types::WATERING_DUE => match field("plant") {
            Some(plant) => format!("Water the {plant}"),
            None => "Water the garden".to_string(),
        },
        other => format!("Follow up on {other}"),
    }
}

/// Publish `Calendar.DayStarted` for today
pub(crate) async fn announce_day(bus: &ModuleEventBus) -> Result<Event, BusError> {
    let day = DayStarted {
        date: Utc::now().date_naive(),
    };
    bus.emit(event_types::DAY_STARTED, serde_json::json!(day))
        .await
}

pub struct CalendarModule {
    manifest: ModuleManifest,
    agenda: Arc<Agenda>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl CalendarModule {
    pub fn new() -> Result<Self, ModuleError> {
        Ok(Self {
            manifest: ModuleManifest::from_json(MANIFEST)?,
            agenda: Arc::default(),
            ticker: Mutex::new(None),
        })
    }

    pub fn create() -> Result<Arc<dyn Module>, ModuleError> {
        Ok(Arc::new(Self::new()?))
    }

    pub fn reminders(&self) -> Vec<Reminder> {
        self.agenda
            .reminders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn start_ticker(&self, bus: ModuleEventBus, period: Duration) {
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if let Err(e) = announce_day(&bus).await {
                    tracing::warn!(module = "calendar", error = %e, "failed to announce day");
                }
            }
        });
        *self.ticker.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
    }
}

#[async_trait]
impl Module for CalendarModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let tick: Option<String> = ctx.config.get("tick_interval")?;
        if let Some(tick) = tick {
            let period = humantime::parse_duration(&tick).map_err(|e| {
                ModuleError::failed(format!("invalid tick_interval '{tick}': {e}"))
            })?;
            if period.is_zero() {
                return Err(ModuleError::failed("tick_interval must be positive"));
            }
            self.start_ticker(ctx.event_bus.clone(), period);
            ctx.logger.info(&format!("announcing a day every {tick}"));
        }

        let _ = self.agenda.bus.set(ctx.event_bus);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        if let Some(ticker) = self.ticker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            ticker.abort();
        }
        Ok(())
    }

    fn event_handlers(&self) -> Vec<HandlerSpec> {
        ["Finance.*", "Garden.*"]
            .into_iter()
            .map(|pattern| {
                let agenda = Arc::clone(&self.agenda);
                let handler = handler_fn(move |event: Event| {
                    let agenda = Arc::clone(&agenda);
                    async move {
                        agenda.remind(&event).await?;
                        Ok::<(), HandlerError>(())
                    }
                });
                HandlerSpec::new(pattern, handler)
            })
            .collect()
    }

    async fn health_check(&self) -> Option<HealthStatus> {
        let ticker_died = self
            .ticker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if ticker_died {
            return Some(HealthStatus::unhealthy("day ticker stopped"));
        }
        let count = self.reminders().len();
        Some(HealthStatus::healthy().with_message(format!("{count} reminder(s)")))
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
