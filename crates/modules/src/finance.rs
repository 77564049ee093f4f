// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `finance` module: opens a budget at the start of every month
//!
//! Config:
//! - `monthly_budget` - amount to budget; without it no budgets are opened
//! - `currency` - defaults to `USD`
//!
//! When the host grants storage, each budget is also appended to
//! `finance/budgets.jsonl` under the data directory.

use crate::{bus, event_types, DataDir, DayStarted};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use lifehub_core::{
    handler_fn, Event, HandlerError, HandlerSpec, Module, ModuleContext, ModuleError,
    ModuleEventBus, ModuleManifest,
};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

const MANIFEST: &str = include_str!("manifests/finance.json");
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone)]
struct Settings {
    monthly_budget: Option<f64>,
    currency: String,
    ledger: Option<PathBuf>,
}

#[derive(Default)]
struct Books {
    bus: OnceLock<ModuleEventBus>,
    settings: OnceLock<Settings>,
    budgets: Mutex<Vec<Budget>>,
}

impl Books {
    /// Open the budget for the month containing `date`, once per month
    async fn open_budget(&self, date: NaiveDate) -> Result<Option<Budget>, ModuleError> {
        let settings = self
            .settings
            .get()
            .ok_or_else(|| ModuleError::failed("module is not initialized"))?;
        let Some(amount) = settings.monthly_budget else {
            return Ok(None);
        };

        let budget = Budget {
            month: format!("{:04}-{:02}", date.year(), date.month()),
            amount,
            currency: settings.currency.clone(),
        };
        {
            let mut budgets = self.budgets.lock().unwrap_or_else(|e| e.into_inner());
            if budgets.iter().any(|b| b.month == budget.month) {
                return Ok(None);
            }
            budgets.push(budget.clone());
        }

        // The month stays open only once the budget is written and announced
        if let Err(e) = self.publish(settings, &budget).await {
            self.budgets
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|b| b.month != budget.month);
            return Err(e);
        }
        tracing::info!(module = "finance", month = %budget.month, amount, "opened budget");
        Ok(Some(budget))
    }

    async fn publish(&self, settings: &Settings, budget: &Budget) -> Result<(), ModuleError> {
        if let Some(path) = &settings.ledger {
            append_to_ledger(path, budget)?;
        }
        let payload =
            serde_json::to_value(budget).map_err(|e| ModuleError::failed(e.to_string()))?;
        bus(&self.bus)?
            .emit(event_types::BUDGET_CREATED, payload)
            .await?;
        Ok(())
    }
}

fn append_to_ledger(path: &Path, budget: &Budget) -> Result<(), ModuleError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let line = serde_json::to_string(budget)?;
        writeln!(file, "{line}")
    };
    write().map_err(|e| ModuleError::failed(format!("ledger {}: {e}", path.display())))
}

pub struct FinanceModule {
    manifest: ModuleManifest,
    books: Arc<Books>,
}

impl FinanceModule {
    pub fn new() -> Result<Self, ModuleError> {
        Ok(Self {
            manifest: ModuleManifest::from_json(MANIFEST)?,
            books: Arc::default(),
        })
    }

    pub fn create() -> Result<Arc<dyn Module>, ModuleError> {
        Ok(Arc::new(Self::new()?))
    }

    pub fn budgets(&self) -> Vec<Budget> {
        self.books
            .budgets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Module for FinanceModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let ledger = ctx
            .database
            .as_ref()
            .and_then(|db| db.downcast_ref::<DataDir>())
            .map(|dir| dir.0.join("finance").join("budgets.jsonl"));
        let settings = Settings {
            monthly_budget: ctx.config.get("monthly_budget")?,
            currency: ctx.config.get_or("currency", DEFAULT_CURRENCY.to_string())?,
            ledger,
        };
        if settings.monthly_budget.is_none() {
            ctx.logger.warn("no monthly_budget configured; budgets are disabled");
        }

        let _ = self.books.settings.set(settings);
        let _ = self.books.bus.set(ctx.event_bus);
        self.books.open_budget(Utc::now().date_naive()).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn event_handlers(&self) -> Vec<HandlerSpec> {
        let books = Arc::clone(&self.books);
        let handler = handler_fn(move |event: Event| {
            let books = Arc::clone(&books);
            async move {
                let day: DayStarted = event.payload_as()?;
                if day.date.day() == 1 {
                    books.open_budget(day.date).await?;
                }
                Ok::<(), HandlerError>(())
            }
        });
        vec![HandlerSpec::new(event_types::DAY_STARTED, handler)]
    }
}

#[cfg(test)]
#[path = "finance_tests.rs"]
mod tests;
