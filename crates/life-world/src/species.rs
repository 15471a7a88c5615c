//! Species and lineage tracking.
//!
//! A species is one heritable anatomy lineage. Births into the lineage raise
//! its population, deaths lower it, and when the last member dies the record
//! is handed to a [`FossilArchive`] and dropped from the active set. Ancestor
//! links are plain ids, so a pruned ancestor simply stops resolving.

use chrono::{DateTime, Utc};
use life_anatomy::Anatomy;
use life_core::{CellType, LineageId};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub id: LineageId,
    pub name: String,
    /// Hue in degrees, used by renderers as the lineage color
    pub hue: f32,
    pub anatomy: Anatomy,
    pub cell_counts: BTreeMap<CellType, u32>,
    pub ancestor: Option<LineageId>,
    pub population: u32,
    pub cumulative_population: u32,
    pub start_tick: u64,
    pub end_tick: Option<u64>,
    pub extinct: bool,
}

impl Species {
    fn new(anatomy: &Anatomy, ancestor: Option<LineageId>, start_tick: u64, rng: &mut ChaCha8Rng) -> Self {
        let id = LineageId::from_rng(rng);
        Self {
            id,
            name: id.short(),
            hue: rng.gen_range(0.0..360.0),
            anatomy: anatomy.clone(),
            cell_counts: anatomy.cell_counts(),
            ancestor,
            population: 1,
            cumulative_population: 1,
            start_tick,
            end_tick: None,
            extinct: false,
        }
    }

    pub fn add_pop(&mut self) {
        self.population += 1;
        self.cumulative_population += 1;
    }

    /// Returns true when this call drove the species extinct.
    fn decrease_pop(&mut self, tick: u64) -> bool {
        if self.extinct {
            return false;
        }
        self.population = self.population.saturating_sub(1);
        if self.population == 0 {
            self.extinct = true;
            self.end_tick = Some(tick);
            return true;
        }
        false
    }

    /// Ticks between first appearance and extinction
    pub fn lifespan(&self) -> Option<u64> {
        self.end_tick.map(|end| end.saturating_sub(self.start_tick))
    }

    /// CSS-style color string
    pub fn color(&self) -> String {
        format!("hsl({:.0}, 70%, 70%)", self.hue)
    }
}

/// Append-only store for extinct species.
pub trait FossilArchive {
    fn fossilize(&mut self, species: Species);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fossil {
    pub species: Species,
    pub archived_at: DateTime<Utc>,
}

/// In-memory fossil archive
#[derive(Debug, Default)]
pub struct FossilRecord {
    fossils: Vec<Fossil>,
}

impl FossilRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fossils(&self) -> &[Fossil] {
        &self.fossils
    }

    pub fn len(&self) -> usize {
        self.fossils.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fossils.is_empty()
    }

    /// Longest-lived extinct species
    pub fn longest_lived(&self) -> Option<&Species> {
        self.fossils
            .iter()
            .map(|f| &f.species)
            .max_by_key(|s| s.lifespan().unwrap_or(0))
    }
}

impl FossilArchive for FossilRecord {
    fn fossilize(&mut self, species: Species) {
        self.fossils.push(Fossil {
            species,
            archived_at: Utc::now(),
        });
    }
}

/// Tracks living species and retires extinct ones to an archive
#[derive(Debug, Default)]
pub struct SpeciesTracker<A: FossilArchive = FossilRecord> {
    active: HashMap<LineageId, Species>,
    archive: A,
    extinctions: u64,
}

impl<A: FossilArchive> SpeciesTracker<A> {
    pub fn new(archive: A) -> Self {
        Self {
            active: HashMap::new(),
            archive,
            extinctions: 0,
        }
    }

    /// Register a newly observed lineage with one member.
    pub fn create(
        &mut self,
        anatomy: &Anatomy,
        ancestor: Option<LineageId>,
        tick: u64,
        rng: &mut ChaCha8Rng,
    ) -> LineageId {
        let species = Species::new(anatomy, ancestor, tick, rng);
        let id = species.id;
        debug!(
            event = "species_created",
            species = %species.name,
            ancestor = ?ancestor.map(|a| a.short()),
            cells = anatomy.cell_count(),
            tick,
            "New species"
        );
        self.active.insert(id, species);
        id
    }

    /// Count a birth into an existing lineage.
    pub fn add_pop(&mut self, id: LineageId) -> bool {
        match self.active.get_mut(&id) {
            Some(species) => {
                species.add_pop();
                true
            }
            None => {
                warn!(species = %id, "Birth into unknown species");
                false
            }
        }
    }

    /// Count a death. Returns true if the lineage went extinct and was archived.
    pub fn decrease_pop(&mut self, id: LineageId, tick: u64) -> bool {
        let Some(species) = self.active.get_mut(&id) else {
            warn!(species = %id, "Death in unknown or archived species");
            return false;
        };

        if !species.decrease_pop(tick) {
            return false;
        }

        if let Some(species) = self.active.remove(&id) {
            info!(
                event = "species_extinct",
                species = %species.name,
                lifespan = species.lifespan().unwrap_or(0),
                cumulative_population = species.cumulative_population,
                tick,
                "Species went extinct"
            );
            self.extinctions += 1;
            self.archive.fossilize(species);
        }
        true
    }

    pub fn get(&self, id: LineageId) -> Option<&Species> {
        self.active.get(&id)
    }

    /// The parent species, while it is still alive.
    pub fn ancestor_of(&self, id: LineageId) -> Option<&Species> {
        self.get(id)
            .and_then(|s| s.ancestor)
            .and_then(|ancestor| self.get(ancestor))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn extinction_count(&self) -> u64 {
        self.extinctions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.active.values()
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }
}
