//! 2D grid for the world.

use life_core::{Neighborhood, OrganismId, Position};
use serde::{Deserialize, Serialize};

/// What occupies a grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Food,
    OrganismPart,
}

/// Occupancy of one grid position.
///
/// `part` is the index of the occupying cell inside the owner's anatomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridCell {
    #[default]
    Empty,
    Food,
    Organism { owner: OrganismId, part: usize },
}

impl GridCell {
    pub fn kind(&self) -> CellKind {
        match self {
            GridCell::Empty => CellKind::Empty,
            GridCell::Food => CellKind::Food,
            GridCell::Organism { .. } => CellKind::OrganismPart,
        }
    }

    pub fn owner(&self) -> Option<OrganismId> {
        match self {
            GridCell::Organism { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    pub fn part(&self) -> Option<usize> {
        match self {
            GridCell::Organism { part, .. } => Some(*part),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, GridCell::Empty)
    }

    pub fn is_food(&self) -> bool {
        matches!(self, GridCell::Food)
    }
}

/// A 2D toroidal grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
    cells: Vec<GridCell>,
}

impl Grid {
    pub fn new(cols: i32, rows: i32) -> Self {
        debug_assert!(cols > 0 && rows > 0, "grid dimensions must be positive");
        let size = (cols * rows) as usize;
        Self {
            cols,
            rows,
            cells: vec![GridCell::Empty; size],
        }
    }

    /// Wrap a position onto the lattice
    pub fn wrap(&self, pos: Position) -> Position {
        pos.wrap(self.cols, self.rows)
    }

    /// Get the cell at a position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> GridCell {
        self.cells[self.pos_to_index(self.wrap(pos))]
    }

    /// Set the cell at a position (with toroidal wrapping)
    pub fn set(&mut self, pos: Position, cell: GridCell) {
        let index = self.pos_to_index(self.wrap(pos));
        self.cells[index] = cell;
    }

    /// Wrapped neighbor positions and their cells, in the neighborhood's scan order
    pub fn neighbors(
        &self,
        pos: Position,
        neighborhood: Neighborhood,
    ) -> impl Iterator<Item = (Position, GridCell)> + '_ {
        neighborhood.offsets().iter().map(move |(dx, dy)| {
            let neighbor = self.wrap(pos.add(*dx, *dy));
            (neighbor, self.get(neighbor))
        })
    }

    /// Number of positions holding the given kind
    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|c| c.kind() == kind).count()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.cols + pos.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.cols;
        let y = (index as i32) / self.cols;
        Position::new(x, y)
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, GridCell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), *cell))
    }
}
