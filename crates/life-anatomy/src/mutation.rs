//! Mutation operators for anatomies.

use crate::anatomy::Anatomy;
use crate::policy::DecisionPolicy;
use life_core::{CellType, Hyperparameters};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability that a newborn mutates at all
    pub rate: f64,
    /// Relative weight of adding a cell
    pub add_weight: f64,
    /// Relative weight of retyping a cell
    pub change_weight: f64,
    /// Relative weight of removing a cell
    pub remove_weight: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self::from(&Hyperparameters::default())
    }
}

impl From<&Hyperparameters> for MutationConfig {
    fn from(hp: &Hyperparameters) -> Self {
        Self {
            rate: hp.mutation_rate,
            add_weight: hp.add_prob,
            change_weight: hp.change_prob,
            remove_weight: hp.remove_prob,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Add,
    Change,
    Remove,
}

/// What a mutation attempt did. `changed` is false when the drawn edit was
/// impossible (occupied offset, protected anchor, single cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub changed: bool,
}

pub struct Mutator {
    config: MutationConfig,
}

impl Mutator {
    pub fn new(config: MutationConfig) -> Self {
        Self { config }
    }

    /// Roll the mutation rate and mutate on success.
    pub fn maybe_mutate(
        &self,
        anatomy: &mut Anatomy,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> Option<Mutation> {
        if rng.gen::<f64>() < self.config.rate {
            self.mutate(anatomy, policy, rng)
        } else {
            None
        }
    }

    /// Apply exactly one weighted edit. `None` only when every weight is zero.
    pub fn mutate(
        &self,
        anatomy: &mut Anatomy,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> Option<Mutation> {
        debug_assert!(!anatomy.is_empty(), "mutating an anatomy with no cells");

        let kind = self.choose_kind(rng)?;
        let changed = match kind {
            MutationKind::Add => self.add_cell(anatomy, policy, rng),
            MutationKind::Change => self.change_cell(anatomy, policy, rng),
            MutationKind::Remove => self.remove_cell(anatomy, rng),
        };

        trace!(?kind, changed, cells = anatomy.cell_count(), "Anatomy mutated");
        Some(Mutation { kind, changed })
    }

    pub fn choose_kind(&self, rng: &mut ChaCha8Rng) -> Option<MutationKind> {
        let weights = [
            (MutationKind::Add, self.config.add_weight.max(0.0)),
            (MutationKind::Change, self.config.change_weight.max(0.0)),
            (MutationKind::Remove, self.config.remove_weight.max(0.0)),
        ];
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return None;
        }

        let mut roll = rng.gen::<f64>() * total;
        for (kind, weight) in weights {
            if roll < weight {
                return Some(kind);
            }
            roll -= weight;
        }
        // float rounding can leave the roll just past the last bucket
        weights
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(kind, _)| *kind)
    }

    fn add_cell(
        &self,
        anatomy: &mut Anatomy,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let Some(base) = anatomy.random_cell(rng).copied() else {
            return false;
        };
        let col = base.col() + rng.gen_range(-1..=1);
        let row = base.row() + rng.gen_range(-1..=1);
        if !anatomy.can_add_cell_at(col, row) {
            return false;
        }
        let cell_type = CellType::random(rng);
        anatomy.add_randomized_cell(cell_type, col, row, policy, rng)
    }

    fn change_cell(
        &self,
        anatomy: &mut Anatomy,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let Some(target) = anatomy.random_cell(rng).copied() else {
            return false;
        };
        let cell_type = CellType::random(rng);
        anatomy.retype_cell(target.col(), target.row(), cell_type, policy, rng)
    }

    fn remove_cell(&self, anatomy: &mut Anatomy, rng: &mut ChaCha8Rng) -> bool {
        if anatomy.cell_count() <= 1 {
            return false;
        }
        let Some(target) = anatomy.random_cell(rng).copied() else {
            return false;
        };
        anatomy.remove_cell(target.col(), target.row(), false)
    }
}
