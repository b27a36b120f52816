//! Fine per-cell blocked-edge grid derived from building walls and doors,
//! with embedded A* scratch fields.
//!
//! A cell edge is blocked iff it coincides with a wall segment (a room
//! boundary or a building exterior wall) that carries no door. Cells outside
//! buildings have open edges. Scratch data is invalidated by bumping a
//! generation counter instead of sweeping the grid between searches.

use crate::mapgen::{Building, CityMap};
use crate::types::{Dir, Pos};

#[derive(Clone, Debug)]
pub(super) struct EdgeCell {
    pub blocked: u8,
    /// A* scratch, valid only while `calculation_id` matches the grid's
    /// current search id.
    pub cost: u32,
    pub total_cost: u32,
    pub prev: Pos,
    pub calculation_id: u64,
}

impl EdgeCell {
    fn open() -> EdgeCell {
        EdgeCell {
            blocked: 0,
            cost: 0,
            total_cost: 0,
            prev: Pos { y: -1, x: -1 },
            calculation_id: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlockedEdgeGrid {
    width: i32,
    height: i32,
    pub(super) cells: Vec<EdgeCell>,
    current_search: u64,
}

impl BlockedEdgeGrid {
    /// An all-open grid, used by tests and tools that exercise the
    /// pathfinder without a generated city.
    pub fn new_open(width: i32, height: i32) -> BlockedEdgeGrid {
        BlockedEdgeGrid {
            width,
            height,
            cells: vec![EdgeCell::open(); (width * height).max(0) as usize],
            current_search: 0,
        }
    }

    /// Derive the grid from a generated city map. Rebuilt whenever the
    /// building layout changes.
    pub fn derive(map: &CityMap) -> BlockedEdgeGrid {
        let mut grid = BlockedEdgeGrid::new_open(map.width, map.height);
        for (_, building) in &map.buildings {
            grid.stamp_building(building);
        }
        grid
    }

    fn stamp_building(&mut self, building: &Building) {
        let bounds = building.bounds;
        for local_y in 0..bounds.height {
            for local_x in 0..bounds.width {
                let local = Pos { y: local_y, x: local_x };
                let room = building.room_index_at(local);
                for dir in Dir::ALL {
                    let neighbor = local.step(dir);
                    let is_wall = if building.in_local_bounds(neighbor) {
                        building.room_index_at(neighbor) != room
                    } else {
                        // Footprint boundary: exterior wall.
                        true
                    };
                    if is_wall && !building.door_at(local, dir) {
                        let global = Pos { y: bounds.y + local_y, x: bounds.x + local_x };
                        self.block_edge(global, dir);
                    }
                }
            }
        }
    }

    /// Block one edge and its reciprocal on the neighboring cell.
    pub fn block_edge(&mut self, pos: Pos, dir: Dir) {
        if let Some(index) = self.index_of(pos) {
            self.cells[index].blocked |= dir.bit();
        }
        let neighbor = pos.step(dir);
        if let Some(index) = self.index_of(neighbor) {
            self.cells[index].blocked |= dir.opposite().bit();
        }
    }

    /// Is edge `dir` of `pos` impassable? Edges leading out of bounds are.
    pub fn is_blocked(&self, pos: Pos, dir: Dir) -> bool {
        let Some(index) = self.index_of(pos) else {
            return true;
        };
        if self.index_of(pos.step(dir)).is_none() {
            return true;
        }
        self.cells[index].blocked & dir.bit() != 0
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Start a new search: returns the id that marks scratch data as fresh.
    /// A u64 counter cannot realistically wrap within a session, so no
    /// wraparound handling is needed beyond the width of the type.
    pub(super) fn begin_search(&mut self) -> u64 {
        self.current_search += 1;
        self.current_search
    }

    pub(super) fn index_of(&self, pos: Pos) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_grid_blocks_only_the_border() {
        let grid = BlockedEdgeGrid::new_open(4, 3);
        assert!(!grid.is_blocked(Pos { y: 1, x: 1 }, Dir::East));
        assert!(grid.is_blocked(Pos { y: 0, x: 0 }, Dir::North));
        assert!(grid.is_blocked(Pos { y: 0, x: 0 }, Dir::West));
        assert!(grid.is_blocked(Pos { y: 2, x: 3 }, Dir::East));
        assert!(grid.is_blocked(Pos { y: 5, x: 5 }, Dir::North));
    }

    #[test]
    fn blocking_an_edge_blocks_the_reciprocal_side() {
        let mut grid = BlockedEdgeGrid::new_open(5, 5);
        grid.block_edge(Pos { y: 2, x: 2 }, Dir::East);
        assert!(grid.is_blocked(Pos { y: 2, x: 2 }, Dir::East));
        assert!(grid.is_blocked(Pos { y: 2, x: 3 }, Dir::West));
        assert!(!grid.is_blocked(Pos { y: 2, x: 2 }, Dir::West));
    }

    #[test]
    fn search_ids_increase_monotonically() {
        let mut grid = BlockedEdgeGrid::new_open(2, 2);
        let first = grid.begin_search();
        let second = grid.begin_search();
        assert!(second > first);
    }
}
