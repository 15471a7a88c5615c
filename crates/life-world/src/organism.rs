//! Organism state and management.

use life_anatomy::{Anatomy, Cell, DecisionPolicy, RandomWalk};
use life_core::{Hyperparameters, LineageId, Position};

/// An organism in the simulation
#[derive(Debug)]
pub struct Organism {
    /// Anchor position; every cell offset is relative to it
    pub position: Position,
    pub anatomy: Anatomy,
    pub energy: f64,
    pub health: i32,
    pub age: u64,
    pub lifespan: u64,
    pub species: LineageId,
    pub birth_tick: u64,
    pub offspring_count: u32,
    policy: Box<dyn DecisionPolicy>,
    dead: bool,
}

impl Organism {
    pub fn new(
        position: Position,
        anatomy: Anatomy,
        energy: f64,
        species: LineageId,
        birth_tick: u64,
        lifespan_multiplier: u64,
    ) -> Self {
        debug_assert!(!anatomy.is_empty(), "organism without cells");
        let mut organism = Self {
            position,
            anatomy,
            energy,
            health: 0,
            age: 0,
            lifespan: 0,
            species,
            birth_tick,
            offspring_count: 0,
            policy: Box::new(RandomWalk),
            dead: false,
        };
        organism.reset_vitals(lifespan_multiplier);
        organism
    }

    pub fn with_policy(mut self, policy: Box<dyn DecisionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Health and lifespan both scale with body size.
    pub fn reset_vitals(&mut self, lifespan_multiplier: u64) {
        let cells = self.anatomy.cell_count();
        self.health = cells as i32;
        self.lifespan = cells as u64 * lifespan_multiplier;
    }

    pub fn cell_count(&self) -> usize {
        self.anatomy.cell_count()
    }

    pub fn policy(&self) -> &dyn DecisionPolicy {
        self.policy.as_ref()
    }

    pub fn policy_mut(&mut self) -> &mut dyn DecisionPolicy {
        self.policy.as_mut()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub(crate) fn mark_dead(&mut self) {
        self.health = 0;
        self.dead = true;
    }

    /// Age, starvation or injury ends the organism on its next update.
    pub fn should_die(&self) -> bool {
        self.age > self.lifespan || self.energy <= 0.0 || self.health <= 0
    }

    /// Armor anywhere in the body negates all damage.
    pub fn take_damage(&mut self, amount: i32) {
        if !self.anatomy.has_armor() {
            self.health = self.health.saturating_sub(amount);
        }
    }

    pub fn reproduction_cost(&self, hp: &Hyperparameters) -> f64 {
        let mut cost = self.cell_count() as f64 + hp.reproduction_base_cost;
        if self.anatomy.is_mover() {
            cost += hp.extra_mover_food_cost;
        }
        cost
    }

    /// Absolute, unwrapped position of a cell for a given anchor
    pub fn cell_position_at(anchor: Position, cell: &Cell) -> Position {
        anchor.add(cell.col(), cell.row())
    }

    /// Wrapped grid positions of every cell, paired with the cell's index
    pub fn occupied_positions(&self, cols: i32, rows: i32) -> Vec<(usize, Position)> {
        self.anatomy
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| (i, Self::cell_position_at(self.position, cell).wrap(cols, rows)))
            .collect()
    }
}
