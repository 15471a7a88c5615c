//! A single body cell of an organism.

use life_core::CellType;
use serde::{Deserialize, Serialize};

/// One body part, positioned relative to the organism's anchor.
///
/// The offset is fixed once the cell exists; only the type may be changed,
/// and only through [`crate::Anatomy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "type")]
    cell_type: CellType,
    col: i32,
    row: i32,
}

impl Cell {
    pub fn new(cell_type: CellType, col: i32, row: i32) -> Self {
        Self { cell_type, col, row }
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.col, self.row)
    }

    pub fn is_anchor(&self) -> bool {
        self.col == 0 && self.row == 0
    }

    pub(crate) fn set_type(&mut self, cell_type: CellType) {
        self.cell_type = cell_type;
    }
}
