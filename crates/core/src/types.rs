//! Shared grid primitives, world-space boxes, and generation error types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A tile-grid coordinate. Row-major ordering: `y` first, top row is 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

/// One of the four cell edges / cardinal directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dir {
    North,
    East,
    South,
    West,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::North, Dir::East, Dir::South, Dir::West];

    pub fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::East => Dir::West,
            Dir::South => Dir::North,
            Dir::West => Dir::East,
        }
    }

    /// Unit step toward this direction in grid space.
    pub fn offset(self) -> Pos {
        match self {
            Dir::North => Pos { y: -1, x: 0 },
            Dir::East => Pos { y: 0, x: 1 },
            Dir::South => Pos { y: 1, x: 0 },
            Dir::West => Pos { y: 0, x: -1 },
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            Dir::North => 0b0001,
            Dir::East => 0b0010,
            Dir::South => 0b0100,
            Dir::West => 0b1000,
        }
    }
}

impl Pos {
    pub fn step(self, dir: Dir) -> Pos {
        let delta = dir.offset();
        Pos { y: self.y + delta.y, x: self.x + delta.x }
    }
}

/// Set of cell edges, one bit per [`Dir`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirMask(pub u8);

impl DirMask {
    pub const EMPTY: DirMask = DirMask(0);

    pub fn contains(self, dir: Dir) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn insert(&mut self, dir: Dir) {
        self.0 |= dir.bit();
    }

    pub fn remove(&mut self, dir: Dir) {
        self.0 &= !dir.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Dir> {
        Dir::ALL.into_iter().filter(move |dir| self.contains(*dir))
    }
}

/// Coarse tile-map cell classification for the generated city.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Road,
    Pavement,
    BuildingFloor,
}

/// An axis-aligned integer rectangle on the tile grid.
/// `right`/`bottom` are inclusive, matching cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl GridRect {
    pub fn right(self) -> i32 {
        self.x + self.width - 1
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height - 1
    }

    pub fn area(self) -> i32 {
        self.width * self.height
    }

    pub fn contains(self, pos: Pos) -> bool {
        pos.x >= self.x && pos.x <= self.right() && pos.y >= self.y && pos.y <= self.bottom()
    }

    pub fn intersects(self, other: &GridRect) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    /// Shrink the rectangle by `margin` cells on every side.
    /// Returns `None` when nothing would remain.
    pub fn shrunk(self, margin: i32) -> Option<GridRect> {
        let width = self.width - 2 * margin;
        let height = self.height - 2 * margin;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(GridRect { x: self.x + margin, y: self.y + margin, width, height })
    }
}

/// World-space axis-aligned box. `y` is up; grid `y` maps to world `z`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
}

impl Aabb {
    pub fn intersects_xz(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_z <= other.max_z
            && self.max_z >= other.min_z
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_x >= self.max_x || self.min_z >= self.max_z
    }
}

/// Fatal layout-generation failures. Query misses are ordinary values
/// (see `pathfind::PathOutcome`), not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// `max_leaf` cannot hold two minimum leaves plus the corridor.
    SplitParams { min_leaf: i32, max_leaf: i32, corridor_width: i32 },
    /// Connectivity repair made a full pass without reaching every room.
    Disconnected { reached: usize, total: usize },
    /// The requested grid cannot hold a single leaf.
    EmptyLayout { width: i32, height: i32 },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SplitParams { min_leaf, max_leaf, corridor_width } => write!(
                f,
                "split parameters unsatisfiable: max_leaf {max_leaf} < 2 * min_leaf {min_leaf} + corridor {corridor_width}"
            ),
            Self::Disconnected { reached, total } => {
                write!(f, "room graph repair stalled: reached {reached} of {total} rooms")
            }
            Self::EmptyLayout { width, height } => {
                write!(f, "grid {width}x{height} cannot hold a single leaf")
            }
        }
    }
}

impl std::error::Error for GenError {}
