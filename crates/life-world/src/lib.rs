//! World simulation engine.
//!
//! This crate implements the toroidal grid where organisms eat, grow food,
//! fight, move, reproduce with mutation and form species.

pub mod grid;
pub mod organism;
pub mod simulation;
pub mod behavior;
pub mod species;
pub mod stats;

pub use grid::{CellKind, Grid, GridCell};
pub use organism::Organism;
pub use simulation::{starter_anatomy, Simulation};
pub use behavior::UpdateOutcome;
pub use species::{Fossil, FossilArchive, FossilRecord, Species, SpeciesTracker};
pub use stats::{PopulationStats, TickSummary};
