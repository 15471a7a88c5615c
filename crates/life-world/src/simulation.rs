//! Simulation engine: arena of organisms, tick loop and spawning.

use crate::grid::{Grid, GridCell};
use crate::organism::Organism;
use crate::species::{FossilArchive, FossilRecord, SpeciesTracker};
use crate::stats::{PopulationStats, TickSummary};
use life_anatomy::{Anatomy, DecisionPolicy, MutationConfig, Mutator, RandomWalk};
use life_core::{CellType, Hyperparameters, OrganismId, Position, Result, WorldConfig};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use slotmap::SlotMap;
use std::collections::HashSet;
use tracing::{debug, info, instrument, trace};

/// Mouth at the anchor with a mover below it.
pub fn starter_anatomy() -> Anatomy {
    let mut anatomy = Anatomy::new();
    anatomy.add_default_cell(CellType::Mouth, 0, 0);
    anatomy.add_default_cell(CellType::Mover, 0, 1);
    anatomy
}

/// Single-threaded world state.
///
/// Organisms live in a generational arena; the grid refers to them by
/// handle. `order` fixes the processing sequence: each tick walks it from the
/// last index to the first, newborns are appended and first run on the next
/// tick, and dead organisms are only removed once the pass is over.
pub struct Simulation<A: FossilArchive = FossilRecord> {
    pub(crate) grid: Grid,
    pub(crate) organisms: SlotMap<OrganismId, Organism>,
    pub(crate) order: Vec<OrganismId>,
    pub(crate) species: SpeciesTracker<A>,
    pub(crate) hyperparameters: Hyperparameters,
    pub(crate) mutator: Mutator,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) tick: u64,
    pub(crate) births: u64,
    pub(crate) deaths: u64,
    pub(crate) reproduction_attempts: u64,
    pub(crate) reproduction_failures: u64,
}

impl Simulation<FossilRecord> {
    /// Build a world and seed the initial population.
    pub fn new(world: WorldConfig, hyperparameters: Hyperparameters) -> Result<Self> {
        Self::with_archive(world, hyperparameters, FossilRecord::new())
    }

    /// Build a world with no organisms and no food.
    pub fn empty(world: WorldConfig, hyperparameters: Hyperparameters) -> Result<Self> {
        Self::build(world, hyperparameters, FossilRecord::new())
    }
}

impl<A: FossilArchive> Simulation<A> {
    pub fn with_archive(world: WorldConfig, hyperparameters: Hyperparameters, archive: A) -> Result<Self> {
        let initial = world.initial_organisms;
        let mut sim = Self::build(world, hyperparameters, archive)?;
        sim.seed_population(initial);
        Ok(sim)
    }

    fn build(world: WorldConfig, hyperparameters: Hyperparameters, archive: A) -> Result<Self> {
        world.validate()?;
        hyperparameters.validate()?;

        Ok(Self {
            grid: Grid::new(world.cols, world.rows),
            organisms: SlotMap::with_key(),
            order: Vec::new(),
            species: SpeciesTracker::new(archive),
            mutator: Mutator::new(MutationConfig::from(&hyperparameters)),
            hyperparameters,
            rng: ChaCha8Rng::seed_from_u64(world.seed),
            tick: 0,
            births: 0,
            deaths: 0,
            reproduction_attempts: 0,
            reproduction_failures: 0,
        })
    }

    /// Try `attempts` random spots; occupied ones are skipped, not retried.
    pub fn seed_population(&mut self, attempts: usize) -> usize {
        let mut placed = 0;
        for _ in 0..attempts {
            let x = self.rng.gen_range(0..self.grid.cols);
            let y = self.rng.gen_range(0..self.grid.rows);
            if self.spawn(Position::new(x, y), starter_anatomy()).is_some() {
                placed += 1;
            }
        }
        info!(attempts, placed, "Seeded initial population");
        placed
    }

    /// Place a parentless organism with a random-walk policy.
    pub fn spawn(&mut self, position: Position, anatomy: Anatomy) -> Option<OrganismId> {
        self.spawn_with_policy(position, anatomy, Box::new(RandomWalk))
    }

    /// Place a parentless organism as the founder of a new species.
    /// Returns `None` if any of its cells would land on a non-empty position.
    pub fn spawn_with_policy(
        &mut self,
        position: Position,
        anatomy: Anatomy,
        policy: Box<dyn DecisionPolicy>,
    ) -> Option<OrganismId> {
        if anatomy.is_empty() {
            return None;
        }
        let position = self.grid.wrap(position);
        if !self.fits(position, &anatomy, false) {
            return None;
        }

        let species = self.species.create(&anatomy, None, self.tick, &mut self.rng);
        let organism = Organism::new(
            position,
            anatomy,
            self.hyperparameters.initial_energy,
            species,
            self.tick,
            self.hyperparameters.lifespan_multiplier,
        )
        .with_policy(policy);
        Some(self.insert(organism))
    }

    /// Whether every cell of `anatomy` anchored at `anchor` lands on a distinct
    /// empty position (or on food, when `allow_food`). Bodies wider than the
    /// grid can wrap onto themselves and never fit.
    pub fn fits(&self, anchor: Position, anatomy: &Anatomy, allow_food: bool) -> bool {
        let mut seen = HashSet::with_capacity(anatomy.cell_count());
        anatomy.cells().iter().all(|cell| {
            let pos = self.grid.wrap(Organism::cell_position_at(anchor, cell));
            if !seen.insert(pos) {
                return false;
            }
            match self.grid.get(pos) {
                GridCell::Empty => true,
                GridCell::Food => allow_food,
                GridCell::Organism { .. } => false,
            }
        })
    }

    pub(crate) fn insert(&mut self, organism: Organism) -> OrganismId {
        let id = self.organisms.insert(organism);
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        if let Some(organism) = self.organisms.get(id) {
            for (part, pos) in organism.occupied_positions(cols, rows) {
                debug_assert!(
                    self.grid.get(pos).owner().is_none(),
                    "placing an organism over another"
                );
                self.grid.set(pos, GridCell::Organism { owner: id, part });
            }
        }
        self.order.push(id);
        id
    }

    /// Drop food on a position if it is empty.
    pub fn place_food(&mut self, pos: Position) -> bool {
        if self.grid.get(pos).is_empty() {
            self.grid.set(pos, GridCell::Food);
            true
        } else {
            false
        }
    }

    /// Run the simulation for a number of ticks
    #[instrument(skip(self), fields(start_tick = self.tick))]
    pub fn run(&mut self, ticks: u64, stats_interval: u64) -> PopulationStats {
        info!("Starting simulation for {} ticks", ticks);

        for _ in 0..ticks {
            self.step();

            if stats_interval > 0 && self.tick % stats_interval == 0 {
                self.stats().emit();
            }
        }

        let stats = self.stats();
        stats.emit();
        stats
    }

    /// Execute one simulation step
    pub fn step(&mut self) -> TickSummary {
        self.tick += 1;
        let births_before = self.births;
        let deaths_before = self.deaths;

        // Organisms born during this pass sit past `len` and wait for the next tick.
        let len = self.order.len();
        for index in (0..len).rev() {
            let id = self.order[index];
            self.update_organism(id);
        }

        let extinctions = self.remove_dead();
        let food_spawned = self.spawn_ambient_food();

        let summary = TickSummary {
            tick: self.tick,
            births: self.births - births_before,
            deaths: self.deaths - deaths_before,
            extinctions,
            food_spawned,
            population: self.order.len(),
        };
        trace!(?summary, "Tick complete");
        summary
    }

    fn remove_dead(&mut self) -> usize {
        let tick = self.tick;
        let organisms = &mut self.organisms;
        let species = &mut self.species;
        let mut extinctions = 0;

        self.order.retain(|id| {
            let dead = organisms.get(*id).map_or(true, |o| o.is_dead());
            if dead {
                if let Some(organism) = organisms.remove(*id) {
                    if species.decrease_pop(organism.species, tick) {
                        extinctions += 1;
                    }
                }
            }
            !dead
        });

        extinctions
    }

    fn spawn_ambient_food(&mut self) -> bool {
        if self.rng.gen::<f64>() >= self.hyperparameters.food_spawn_prob {
            return false;
        }
        let x = self.rng.gen_range(0..self.grid.cols);
        let y = self.rng.gen_range(0..self.grid.rows);
        let placed = self.place_food(Position::new(x, y));
        if placed {
            debug!(x, y, tick = self.tick, "Ambient food spawned");
        }
        placed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(id)
    }

    pub fn organism_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.organisms.get_mut(id)
    }

    /// Active organisms in processing order (first processed last)
    pub fn organisms(&self) -> impl Iterator<Item = (OrganismId, &Organism)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.organisms.get(*id).map(|o| (*id, o)))
    }

    pub fn organism_count(&self) -> usize {
        self.order.len()
    }

    pub fn species(&self) -> &SpeciesTracker<A> {
        &self.species
    }

    /// Lineage color for renderers
    pub fn species_color(&self, id: OrganismId) -> Option<String> {
        let organism = self.organisms.get(id)?;
        self.species.get(organism.species).map(|s| s.color())
    }
}
