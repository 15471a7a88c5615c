//! Configuration types for the simulation.

use crate::{Error, Neighborhood, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// World configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of grid columns
    pub cols: i32,
    /// Number of grid rows
    pub rows: i32,
    /// Seeding attempts at startup (occupied spots are skipped)
    pub initial_organisms: usize,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 60,
            initial_organisms: 15,
            seed: 0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cols <= 0 || self.rows <= 0 {
            return Err(Error::Validation(format!(
                "grid must be at least 1x1, got {}x{}",
                self.cols, self.rows
            )));
        }
        Ok(())
    }
}

/// Tunable simulation parameters.
///
/// The field set is fixed: [`Hyperparameters::load_json`] can overwrite
/// existing keys but never adds new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Lifespan granted per body cell
    pub lifespan_multiplier: u64,
    /// Energy burned every tick
    pub metabolic_cost: f64,
    /// Energy gained per eaten food cell
    pub food_energy: f64,
    /// Energy of a newly created organism
    pub initial_energy: f64,
    /// Reproduction costs `cell_count + reproduction_base_cost`
    pub reproduction_base_cost: f64,
    /// Extra reproduction cost for organisms with a mover cell
    pub extra_mover_food_cost: f64,
    /// Chance per producer cell per tick to grow food
    pub food_prod_prob: f64,
    /// Chance per tick that food drops on a random empty position
    pub food_spawn_prob: f64,
    /// Chance that a newborn mutates
    pub mutation_rate: f64,
    /// Relative weight of the add-cell mutation
    pub add_prob: f64,
    /// Relative weight of the change-cell mutation
    pub change_prob: f64,
    /// Relative weight of the remove-cell mutation
    pub remove_prob: f64,
    pub edible_neighbors: Neighborhood,
    pub killable_neighbors: Neighborhood,
    pub growable_neighbors: Neighborhood,
    /// Damage a killer cell deals per contact
    pub kill_damage: i32,
    /// Killer contact removes all of the target's health
    pub insta_kill: bool,
    pub movers_can_produce: bool,
    /// Food cells block offspring placement
    pub food_blocks_reproduction: bool,
    /// Give the energy back when no spot for the offspring was found
    pub refund_failed_reproduction: bool,
    /// Population cap, -1 for none
    pub max_organisms: i64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            lifespan_multiplier: 200,
            metabolic_cost: 0.01,
            food_energy: 3.0,
            initial_energy: 5.0,
            reproduction_base_cost: 5.0,
            extra_mover_food_cost: 0.0,
            food_prod_prob: 0.01,
            food_spawn_prob: 0.05,
            mutation_rate: 0.05,
            add_prob: 33.0,
            change_prob: 33.0,
            remove_prob: 33.0,
            edible_neighbors: Neighborhood::All,
            killable_neighbors: Neighborhood::All,
            growable_neighbors: Neighborhood::All,
            kill_damage: 1,
            insta_kill: false,
            movers_can_produce: true,
            food_blocks_reproduction: true,
            refund_failed_reproduction: false,
            max_organisms: -1,
        }
    }
}

/// Outcome of merging external data into [`Hyperparameters`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub applied: Vec<String>,
    /// Keys that are not hyperparameters
    pub ignored: Vec<String>,
    /// Known keys whose value had the wrong shape
    pub rejected: Vec<String>,
}

impl Hyperparameters {
    /// Merge a JSON object into the current values.
    ///
    /// Unknown keys are ignored and known keys with an unusable value keep
    /// their previous setting. Only a non-object input fails the load.
    pub fn load_json(&mut self, data: &Value) -> Result<LoadReport> {
        let incoming = data.as_object().ok_or_else(|| {
            Error::Validation("hyperparameters must be a JSON object".to_string())
        })?;

        let mut current = self.to_map()?;
        let mut report = LoadReport::default();

        for (key, value) in incoming {
            if !current.contains_key(key) {
                debug!(key = %key, "Ignoring unknown hyperparameter");
                report.ignored.push(key.clone());
                continue;
            }

            let mut candidate = current.clone();
            candidate.insert(key.clone(), value.clone());
            match serde_json::from_value::<Hyperparameters>(Value::Object(candidate.clone())) {
                Ok(_) => {
                    current = candidate;
                    report.applied.push(key.clone());
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Rejected hyperparameter value");
                    report.rejected.push(key.clone());
                }
            }
        }

        *self = serde_json::from_value(Value::Object(current))?;
        Ok(report)
    }

    fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::InvalidState(
                "hyperparameters did not serialize to an object".to_string(),
            )),
        }
    }

    /// Check ranges that the tick loop relies on
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("food_prod_prob", self.food_prod_prob),
            ("food_spawn_prob", self.food_spawn_prob),
            ("mutation_rate", self.mutation_rate),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("add_prob", self.add_prob),
            ("change_prob", self.change_prob),
            ("remove_prob", self.remove_prob),
            ("metabolic_cost", self.metabolic_cost),
            ("reproduction_base_cost", self.reproduction_base_cost),
            ("extra_mover_food_cost", self.extra_mover_food_cost),
        ];
        for (name, value) in non_negative {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::Validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.kill_damage < 0 {
            return Err(Error::Validation("kill_damage must not be negative".to_string()));
        }
        Ok(())
    }

    /// Population cap, if any
    pub fn population_cap(&self) -> Option<usize> {
        usize::try_from(self.max_organisms).ok()
    }
}
