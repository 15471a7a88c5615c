//! Body plan of an organism: an ordered set of cells with unique offsets.

use crate::cell::Cell;
use crate::policy::DecisionPolicy;
use life_core::{CellType, Neighborhood};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered collection of cells plus capability flags derived from them.
///
/// Equality is structural: same cells in the same order. Serialization
/// emits only the cells; the flags are recomputed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnatomyRecord")]
pub struct Anatomy {
    cells: Vec<Cell>,
    #[serde(skip)]
    is_producer: bool,
    #[serde(skip)]
    is_mover: bool,
    #[serde(skip)]
    has_eyes: bool,
    #[serde(skip)]
    has_armor: bool,
}

#[derive(Deserialize)]
struct AnatomyRecord {
    cells: Vec<Cell>,
}

impl From<AnatomyRecord> for Anatomy {
    fn from(record: AnatomyRecord) -> Self {
        Anatomy::from_cells(record.cells)
    }
}

impl Anatomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from cells, dropping any whose offset is already taken.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut anatomy = Self::new();
        for cell in cells {
            anatomy.add_inherited_cell(&cell);
        }
        anatomy
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_producer(&self) -> bool {
        self.is_producer
    }

    pub fn is_mover(&self) -> bool {
        self.is_mover
    }

    pub fn has_eyes(&self) -> bool {
        self.has_eyes
    }

    pub fn has_armor(&self) -> bool {
        self.has_armor
    }

    pub fn can_add_cell_at(&self, col: i32, row: i32) -> bool {
        self.cell_index(col, row).is_none()
    }

    pub fn cell_index(&self, col: i32, row: i32) -> Option<usize> {
        self.cells.iter().position(|c| c.col() == col && c.row() == row)
    }

    pub fn local_cell(&self, col: i32, row: i32) -> Option<&Cell> {
        self.cell_index(col, row).map(|i| &self.cells[i])
    }

    /// Append a cell with no side effects. Returns false if the offset is taken.
    pub fn add_default_cell(&mut self, cell_type: CellType, col: i32, row: i32) -> bool {
        self.push(Cell::new(cell_type, col, row))
    }

    /// Append a cell, waking the decision policy when this is the first eye.
    pub fn add_randomized_cell(
        &mut self,
        cell_type: CellType,
        col: i32,
        row: i32,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        if !self.can_add_cell_at(col, row) {
            return false;
        }
        if cell_type == CellType::Eye && !self.has_eyes {
            policy.randomize(rng);
        }
        self.push(Cell::new(cell_type, col, row))
    }

    /// Copy a parent's cell verbatim.
    pub fn add_inherited_cell(&mut self, parent_cell: &Cell) -> bool {
        self.push(*parent_cell)
    }

    /// Remove whatever sits at the offset (the anchor included) and add a
    /// randomized cell of the new type in its place.
    pub fn replace_cell(
        &mut self,
        cell_type: CellType,
        col: i32,
        row: i32,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        self.remove_cell(col, row, true);
        self.add_randomized_cell(cell_type, col, row, policy, rng)
    }

    /// Change the type of an existing cell in place.
    pub fn retype_cell(
        &mut self,
        col: i32,
        row: i32,
        cell_type: CellType,
        policy: &mut dyn DecisionPolicy,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let Some(index) = self.cell_index(col, row) else {
            return false;
        };
        if cell_type == CellType::Eye && !self.has_eyes {
            policy.randomize(rng);
        }
        self.cells[index].set_type(cell_type);
        self.refresh_flags();
        true
    }

    /// Remove the cell at an offset. The anchor at (0, 0) stays unless
    /// `allow_center_removal` is set. Returns whether a cell was removed.
    pub fn remove_cell(&mut self, col: i32, row: i32, allow_center_removal: bool) -> bool {
        if col == 0 && row == 0 && !allow_center_removal {
            return false;
        }

        let removed = match self.cell_index(col, row) {
            Some(index) => {
                self.cells.remove(index);
                true
            }
            None => false,
        };

        self.refresh_flags();
        removed
    }

    pub fn random_cell(&self, rng: &mut ChaCha8Rng) -> Option<&Cell> {
        if self.cells.is_empty() {
            return None;
        }
        Some(&self.cells[rng.gen_range(0..self.cells.len())])
    }

    /// Cells at the eight offsets around a local coordinate.
    pub fn neighbors_of(&self, col: i32, row: i32) -> Vec<&Cell> {
        self.neighbors_in(col, row, Neighborhood::All)
    }

    pub fn neighbors_in(&self, col: i32, row: i32, neighborhood: Neighborhood) -> Vec<&Cell> {
        neighborhood
            .offsets()
            .iter()
            .filter_map(|(dx, dy)| self.local_cell(col + dx, row + dy))
            .collect()
    }

    /// Number of cells per living type, zero entries included.
    pub fn cell_counts(&self) -> BTreeMap<CellType, u32> {
        let mut counts: BTreeMap<CellType, u32> =
            CellType::LIVING.iter().map(|t| (*t, 0)).collect();
        for cell in &self.cells {
            *counts.entry(cell.cell_type()).or_insert(0) += 1;
        }
        counts
    }

    fn push(&mut self, cell: Cell) -> bool {
        if !self.can_add_cell_at(cell.col(), cell.row()) {
            return false;
        }
        self.cells.push(cell);
        self.refresh_flags();
        true
    }

    fn refresh_flags(&mut self) {
        self.is_producer = false;
        self.is_mover = false;
        self.has_eyes = false;
        self.has_armor = false;
        for cell in &self.cells {
            match cell.cell_type() {
                CellType::Producer => self.is_producer = true,
                CellType::Mover => self.is_mover = true,
                CellType::Eye => self.has_eyes = true,
                CellType::Armor => self.has_armor = true,
                CellType::Mouth | CellType::Killer => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RandomWalk;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Default)]
    struct CountingPolicy {
        randomized: u32,
    }

    impl DecisionPolicy for CountingPolicy {
        fn decide_move(&mut self, _rng: &mut ChaCha8Rng) -> Option<life_core::Direction> {
            None
        }

        fn randomize(&mut self, _rng: &mut ChaCha8Rng) {
            self.randomized += 1;
        }

        fn boxed_clone(&self) -> Box<dyn DecisionPolicy> {
            Box::new(self.clone())
        }

        fn kind(&self) -> &'static str {
            "counting"
        }
    }

    fn starter() -> Anatomy {
        let mut anatomy = Anatomy::new();
        anatomy.add_default_cell(CellType::Mouth, 0, 0);
        anatomy.add_default_cell(CellType::Mover, 0, 1);
        anatomy
    }

    #[test]
    fn test_flags_follow_cells() {
        let mut anatomy = starter();
        assert!(anatomy.is_mover());
        assert!(!anatomy.is_producer());
        assert!(!anatomy.has_armor());

        anatomy.add_default_cell(CellType::Armor, 1, 0);
        assert!(anatomy.has_armor());

        assert!(anatomy.remove_cell(0, 1, false));
        assert!(!anatomy.is_mover());
        assert_eq!(anatomy.cell_count(), 2);
    }

    #[test]
    fn test_duplicate_offset_refused() {
        let mut anatomy = starter();
        assert!(!anatomy.can_add_cell_at(0, 1));
        assert!(!anatomy.add_default_cell(CellType::Killer, 0, 1));
        assert_eq!(anatomy.cell_count(), 2);
        assert!(anatomy.can_add_cell_at(1, 1));
    }

    #[test]
    fn test_anchor_protected() {
        let mut anatomy = starter();
        assert!(!anatomy.remove_cell(0, 0, false));
        assert!(anatomy.local_cell(0, 0).is_some());

        assert!(anatomy.remove_cell(0, 0, true));
        assert!(anatomy.local_cell(0, 0).is_none());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut anatomy = starter();
        assert!(!anatomy.remove_cell(5, 5, false));
        assert_eq!(anatomy.cell_count(), 2);
    }

    #[test]
    fn test_first_eye_wakes_policy() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut policy = CountingPolicy::default();
        let mut anatomy = starter();

        anatomy.add_randomized_cell(CellType::Eye, 1, 0, &mut policy, &mut rng);
        anatomy.add_randomized_cell(CellType::Eye, -1, 0, &mut policy, &mut rng);
        assert_eq!(policy.randomized, 1);
        assert!(anatomy.has_eyes());

        // default cells never touch the policy
        let mut other = starter();
        other.add_default_cell(CellType::Eye, 1, 0);
        assert!(other.has_eyes());
    }

    #[test]
    fn test_retype_to_eye_wakes_policy() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut policy = CountingPolicy::default();
        let mut anatomy = starter();

        assert!(anatomy.retype_cell(0, 1, CellType::Eye, &mut policy, &mut rng));
        assert_eq!(policy.randomized, 1);
        assert!(!anatomy.is_mover());
        assert_eq!(anatomy.cells()[1].cell_type(), CellType::Eye);
        assert!(!anatomy.retype_cell(3, 3, CellType::Eye, &mut policy, &mut rng));
    }

    #[test]
    fn test_replace_leaves_one_cell() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut policy = RandomWalk;
        let mut anatomy = starter();

        assert!(anatomy.replace_cell(CellType::Producer, 0, 0, &mut policy, &mut rng));
        assert_eq!(anatomy.cell_count(), 2);
        assert_eq!(
            anatomy.local_cell(0, 0).map(|c| c.cell_type()),
            Some(CellType::Producer)
        );
        assert!(anatomy.is_producer());

        // replacing an empty offset still leaves exactly one cell there
        assert!(anatomy.replace_cell(CellType::Killer, 2, 2, &mut policy, &mut rng));
        assert_eq!(anatomy.cell_count(), 3);
    }

    #[test]
    fn test_neighbors_of() {
        let mut anatomy = starter();
        anatomy.add_default_cell(CellType::Killer, 1, 1);
        anatomy.add_default_cell(CellType::Armor, 3, 3);

        let neighbors = anatomy.neighbors_of(0, 0);
        assert_eq!(neighbors.len(), 2);

        let orthogonal = anatomy.neighbors_in(0, 0, Neighborhood::Adjacent);
        assert_eq!(orthogonal.len(), 1);
        assert_eq!(orthogonal[0].cell_type(), CellType::Mover);
    }

    #[test]
    fn test_structural_equality() {
        let a = starter();
        let b = Anatomy::from_cells(a.cells().iter().copied());
        assert_eq!(a, b);

        let reordered = Anatomy::from_cells(a.cells().iter().rev().copied());
        assert_ne!(a, reordered);
    }

    #[test]
    fn test_serialization_recomputes_flags() {
        let anatomy = starter();
        let json = serde_json::to_value(&anatomy).unwrap();
        assert_eq!(json["cells"][1]["type"], "Mover");
        assert!(json.get("is_mover").is_none());

        let restored: Anatomy = serde_json::from_value(json).unwrap();
        assert!(restored.is_mover());
        assert_eq!(restored, anatomy);
    }

    #[test]
    fn test_cell_counts_include_all_types() {
        let counts = starter().cell_counts();
        assert_eq!(counts.len(), CellType::LIVING.len());
        assert_eq!(counts[&CellType::Mouth], 1);
        assert_eq!(counts[&CellType::Killer], 0);
    }

    proptest! {
        #[test]
        fn offsets_stay_unique(ops in proptest::collection::vec((any::<bool>(), -3i32..3, -3i32..3), 0..64)) {
            let mut anatomy = Anatomy::new();
            anatomy.add_default_cell(CellType::Mouth, 0, 0);
            for (add, col, row) in ops {
                if add {
                    let free = anatomy.can_add_cell_at(col, row);
                    prop_assert_eq!(anatomy.add_default_cell(CellType::Armor, col, row), free);
                } else {
                    anatomy.remove_cell(col, row, false);
                }
            }

            let mut offsets: Vec<_> = anatomy.cells().iter().map(|c| c.offset()).collect();
            let total = offsets.len();
            offsets.sort();
            offsets.dedup();
            prop_assert_eq!(offsets.len(), total);
            prop_assert!(anatomy.local_cell(0, 0).is_some());
        }
    }
}
