//! Population statistics and per-tick summaries.

use crate::simulation::Simulation;
use crate::grid::CellKind;
use crate::species::FossilArchive;
use serde::{Deserialize, Serialize};
use tracing::info;

/// What happened during one call to [`Simulation::step`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    pub births: u64,
    pub deaths: u64,
    pub extinctions: usize,
    pub food_spawned: bool,
    pub population: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub tick: u64,
    pub organism_count: usize,
    pub max_age: u64,
    pub mean_energy: f64,
    pub mean_cells: f64,
    pub living_species: usize,
    pub extinct_species: u64,
    pub food_cells: usize,
    pub total_births: u64,
    pub total_deaths: u64,
    pub reproduction_attempts: u64,
    pub reproduction_failures: u64,
}

impl PopulationStats {
    /// Emit as a structured log line
    pub fn emit(&self) {
        info!(
            event = "population_metrics",
            tick = self.tick,
            organisms = self.organism_count,
            max_age = self.max_age,
            mean_energy = format!("{:.2}", self.mean_energy),
            mean_cells = format!("{:.2}", self.mean_cells),
            living_species = self.living_species,
            extinct_species = self.extinct_species,
            food = self.food_cells,
            births = self.total_births,
            deaths = self.total_deaths,
            "Population metrics"
        );
    }
}

impl<A: FossilArchive> Simulation<A> {
    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            tick: self.tick,
            living_species: self.species.active_count(),
            extinct_species: self.species.extinction_count(),
            food_cells: self.grid.count(CellKind::Food),
            total_births: self.births,
            total_deaths: self.deaths,
            reproduction_attempts: self.reproduction_attempts,
            reproduction_failures: self.reproduction_failures,
            ..Default::default()
        };

        let mut energy = 0.0;
        let mut cells = 0;
        for (_, organism) in self.organisms() {
            stats.organism_count += 1;
            stats.max_age = stats.max_age.max(organism.age);
            energy += organism.energy;
            cells += organism.cell_count();
        }

        if stats.organism_count > 0 {
            stats.mean_energy = energy / stats.organism_count as f64;
            stats.mean_cells = cells as f64 / stats.organism_count as f64;
        }
        stats
    }
}
