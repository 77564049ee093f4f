// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `garden` module: asks for watering every day

use crate::{bus, event_types, DayStarted};
use async_trait::async_trait;
use lifehub_core::{
    handler_fn, Event, HandlerError, HandlerSpec, HealthStatus, Module, ModuleContext,
    ModuleError, ModuleEventBus, ModuleManifest,
};
use serde_json::json;
use std::sync::{Arc, OnceLock};

const MANIFEST: &str = include_str!("manifests/garden.json");

#[derive(Default)]
struct Beds {
    bus: OnceLock<ModuleEventBus>,
    plants: OnceLock<Vec<String>>,
}

impl Beds {
    fn plants(&self) -> &[String] {
        self.plants.get().map(Vec::as_slice).unwrap_or_default()
    }

    async fn water(&self, day: &DayStarted) -> Result<usize, ModuleError> {
        let bus = bus(&self.bus)?;
        for plant in self.plants() {
            bus.emit(
                event_types::WATERING_DUE,
                json!({ "plant": plant, "date": day.date }),
            )
            .await?;
        }
        Ok(self.plants().len())
    }
}

pub struct GardenModule {
    manifest: ModuleManifest,
    beds: Arc<Beds>,
}

impl GardenModule {
    pub fn new() -> Result<Self, ModuleError> {
        Ok(Self {
            manifest: ModuleManifest::from_json(MANIFEST)?,
            beds: Arc::default(),
        })
    }

    pub fn create() -> Result<Arc<dyn Module>, ModuleError> {
        Ok(Arc::new(Self::new()?))
    }
}

#[async_trait]
impl Module for GardenModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let plants: Vec<String> = ctx.config.get_or("plants", Vec::new())?;
        ctx.logger
            .info(&format!("tending {} plant(s)", plants.len()));
        let _ = self.beds.plants.set(plants);
        let _ = self.beds.bus.set(ctx.event_bus);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn event_handlers(&self) -> Vec<HandlerSpec> {
        let beds = Arc::clone(&self.beds);
        let handler = handler_fn(move |event: Event| {
            let beds = Arc::clone(&beds);
            async move {
                let day: DayStarted = event.payload_as()?;
                let watered = beds.water(&day).await?;
                tracing::debug!(module = "garden", watered, "watering scheduled");
                Ok::<(), HandlerError>(())
            }
        });
        vec![HandlerSpec::new(event_types::DAY_STARTED, handler)]
    }

    async fn health_check(&self) -> Option<HealthStatus> {
        let message = match self.beds.plants().len() {
            0 => "no plants configured".to_string(),
            n => format!("watering {n} plant(s)"),
        };
        Some(HealthStatus::healthy().with_message(message))
    }
}

#[cfg(test)]
#[path = "garden_tests.rs"]
mod tests;
