// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lifehub-modules: Feature modules shipped with the lifehub host
//!
//! Each module embeds its manifest and talks to the others only through
//! events:
//! - `core` keeps an audit count of everything on the bus
//! - `calendar` announces days and turns other modules' events into reminders
//! - `finance` opens a budget each month
//! - `garden` schedules watering for configured plants

mod audit;
mod calendar;
mod finance;
mod garden;

pub use audit::CoreModule;
pub use calendar::{CalendarModule, Reminder};
pub use finance::{Budget, FinanceModule};
pub use garden::GardenModule;

use chrono::NaiveDate;
use lifehub_core::{ModuleCatalog, ModuleError, ModuleEventBus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Event types exchanged by the bundled modules
pub mod event_types {
    pub const CORE_STARTED: &str = "Core.Started";
    pub const DAY_STARTED: &str = "Calendar.DayStarted";
    pub const REMINDER_CREATED: &str = "Calendar.ReminderCreated";
    pub const BUDGET_CREATED: &str = "Finance.BudgetCreated";
    pub const WATERING_DUE: &str = "Garden.WateringDue";
}

/// Storage handle understood by the bundled modules: a directory each
/// module may write its files under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir(pub PathBuf);

/// Payload of `Calendar.DayStarted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStarted {
    pub date: NaiveDate,
}

/// Every bundled module, dependencies first
pub fn catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with("core", CoreModule::create)
        .with("calendar", CalendarModule::create)
        .with("finance", FinanceModule::create)
        .with("garden", GardenModule::create)
}

/// The module's bus facade, available once `initialize` has run
fn bus(cell: &OnceLock<ModuleEventBus>) -> Result<&ModuleEventBus, ModuleError> {
    cell.get()
        .ok_or_else(|| ModuleError::failed("module is not initialized"))
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
