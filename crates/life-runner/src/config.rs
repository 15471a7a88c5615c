//! Run configuration file.
//!
//! ```json
//! { "world": { "cols": 80, "rows": 60 }, "hyperparameters": { "mutation_rate": 0.1 } }
//! ```
//!
//! Both sections are optional. Hyperparameters are merged key by key over the
//! defaults, so a file may name only the values it changes.

use anyhow::{Context, Result};
use life_core::{Hyperparameters, WorldConfig};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub world: WorldConfig,
    pub hyperparameters: Hyperparameters,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let mut config = Self::default();

        if let Some(world) = value.get("world") {
            config.world = serde_json::from_value(world.clone()).context("invalid world section")?;
        }

        if let Some(hp) = value.get("hyperparameters") {
            let report = config.hyperparameters.load_json(hp)?;
            info!(
                applied = report.applied.len(),
                ignored = ?report.ignored,
                rejected = ?report.rejected,
                "Hyperparameters loaded"
            );
            if !report.rejected.is_empty() {
                warn!(keys = ?report.rejected, "Some hyperparameters kept their previous values");
            }
        }

        Ok(config)
    }
}
