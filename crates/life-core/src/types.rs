//! Core type definitions for the simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use uuid::Uuid;

new_key_type! {
    /// Stable handle for an organism stored in the simulation arena.
    pub struct OrganismId;
}

/// Unique identifier for a species lineage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineageId(pub Uuid);

impl LineageId {
    /// Draw an id from the simulation's random source so seeded runs stay reproducible.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(uuid::Builder::from_random_bytes(rng.gen()).into_uuid())
    }

    /// Short label used in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..10].to_string()
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Apply toroidal wrapping for given world dimensions
    pub fn wrap(&self, width: i32, height: i32) -> Self {
        Self {
            x: self.x.rem_euclid(width),
            y: self.y.rem_euclid(height),
        }
    }
}

/// Direction for movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    /// Inverse of [`Direction::to_delta`]. `(0, 0)` means "stay" and maps to `None`.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (1, -1) => Some(Direction::NorthEast),
            (-1, -1) => Some(Direction::NorthWest),
            (1, 1) => Some(Direction::SouthEast),
            (-1, 1) => Some(Direction::SouthWest),
            _ => None,
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

/// Body cell type of an organism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellType {
    Mouth,
    Producer,
    Mover,
    Killer,
    Armor,
    Eye,
}

impl CellType {
    /// Every type a mutation may produce.
    pub const LIVING: [CellType; 6] = [
        CellType::Mouth,
        CellType::Producer,
        CellType::Mover,
        CellType::Killer,
        CellType::Armor,
        CellType::Eye,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CellType::Mouth => "Mouth",
            CellType::Producer => "Producer",
            CellType::Mover => "Mover",
            CellType::Killer => "Killer",
            CellType::Armor => "Armor",
            CellType::Eye => "Eye",
        }
    }

    /// Display color for renderers.
    pub fn color(&self) -> &'static str {
        match self {
            CellType::Mouth => "#d14d72",
            CellType::Producer => "#66a39b",
            CellType::Mover => "#416788",
            CellType::Killer => "#ff4d4d",
            CellType::Armor => "#c0e5c8",
            CellType::Eye => "#b6c1ea",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> CellType {
        Self::LIVING[rng.gen_range(0..Self::LIVING.len())]
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of offsets scanned around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Neighborhood {
    /// The four orthogonal neighbors
    Adjacent,
    /// All eight surrounding positions
    All,
}

const ADJACENT_OFFSETS: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

// Column-major, matching the scan order used for feeding and reproduction.
const ALL_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Neighborhood {
    pub fn offsets(&self) -> &'static [(i32, i32)] {
        match self {
            Neighborhood::Adjacent => &ADJACENT_OFFSETS,
            Neighborhood::All => &ALL_OFFSETS,
        }
    }
}

impl Default for Neighborhood {
    fn default() -> Self {
        Neighborhood::All
    }
}
