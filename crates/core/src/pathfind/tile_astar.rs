//! 8-directional A* over the blocked-edge grid with integer move costs.
//!
//! Cardinal moves cost 10, diagonals 15; the heuristic is straight-line
//! distance scaled by 10 (floored), which is admissible and consistent at
//! these costs. The search exits as soon as the goal is *discovered* rather
//! than popped; with this heuristic the returned cost exceeds the optimum by
//! at most a couple of cost units (the final hop's cost-minus-heuristic
//! slack, plus rounding). Good enough for agents walking a city block.

use std::collections::BTreeSet;

use crate::types::{Dir, Pos};

use super::blocked_grid::BlockedEdgeGrid;

pub const CARDINAL_COST: u32 = 10;
pub const DIAGONAL_COST: u32 = 15;

/// Result of a path query. Misses are values, not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// Waypoints from the first step after the start cell up to the goal.
    Found(Vec<Pos>),
    /// Start and goal fall in the same grid cell; nothing to search.
    SameTile,
    /// Start or goal lies outside the grid.
    Outside,
    /// No unblocked route exists (or the expansion budget ran out).
    NotFound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenNode {
    f: u32,
    h: u32,
    y: i32,
    x: i32,
}

const DIAGONALS: [(Dir, Dir); 4] = [
    (Dir::North, Dir::East),
    (Dir::South, Dir::East),
    (Dir::South, Dir::West),
    (Dir::North, Dir::West),
];

/// Synchronous grid pathfinder, called once per agent per simulation tick.
/// Borrows the grid mutably for its embedded scratch fields.
pub struct TilePathfinder<'a> {
    grid: &'a mut BlockedEdgeGrid,
    tile_size: f32,
    max_expansions: usize,
}

impl<'a> TilePathfinder<'a> {
    pub fn new(grid: &'a mut BlockedEdgeGrid, tile_size: f32) -> TilePathfinder<'a> {
        // Re-inserted open entries can be popped more than once, so the
        // budget leaves headroom over the raw cell count.
        let cell_count = (grid.width() * grid.height()).max(0) as usize;
        TilePathfinder { grid, tile_size, max_expansions: cell_count * 4 }
    }

    /// Cap the number of node expansions per query below the grid size,
    /// trading completeness for a bounded per-tick cost.
    pub fn with_expansion_budget(mut self, max_expansions: usize) -> TilePathfinder<'a> {
        self.max_expansions = max_expansions;
        self
    }

    /// Find a route between two world-space positions.
    pub fn find_path(&mut self, from_world: (f32, f32), to_world: (f32, f32)) -> PathOutcome {
        let start = self.world_to_cell(from_world);
        let goal = self.world_to_cell(to_world);
        if !self.grid.in_bounds(start) || !self.grid.in_bounds(goal) {
            return PathOutcome::Outside;
        }
        if start == goal {
            return PathOutcome::SameTile;
        }
        self.search(start, goal)
    }

    /// Cell-space entry point used by tests and tools.
    pub fn find_cell_path(&mut self, start: Pos, goal: Pos) -> PathOutcome {
        if !self.grid.in_bounds(start) || !self.grid.in_bounds(goal) {
            return PathOutcome::Outside;
        }
        if start == goal {
            return PathOutcome::SameTile;
        }
        self.search(start, goal)
    }

    fn search(&mut self, start: Pos, goal: Pos) -> PathOutcome {
        let search_id = self.grid.begin_search();

        let start_index = self.grid.index_of(start).expect("start checked in bounds");
        {
            let cell = &mut self.grid.cells[start_index];
            cell.calculation_id = search_id;
            cell.cost = 0;
            cell.total_cost = heuristic(start, goal);
            cell.prev = Pos { y: -1, x: -1 };
        }

        let mut open = BTreeSet::new();
        open.insert(OpenNode {
            f: heuristic(start, goal),
            h: heuristic(start, goal),
            y: start.y,
            x: start.x,
        });

        let mut expansions = 0_usize;
        while let Some(node) = open.pop_first() {
            expansions += 1;
            if expansions > self.max_expansions {
                return PathOutcome::NotFound;
            }

            let current = Pos { y: node.y, x: node.x };
            let current_cost = {
                let index = self.grid.index_of(current).expect("open nodes are in bounds");
                self.grid.cells[index].cost
            };

            // Cardinal neighbors.
            for dir in Dir::ALL {
                if self.grid.is_blocked(current, dir) {
                    continue;
                }
                let next = current.step(dir);
                if let Some(path) = self.relax(
                    &mut open,
                    current,
                    next,
                    current_cost + CARDINAL_COST,
                    goal,
                    search_id,
                ) {
                    return path;
                }
            }

            // Diagonal neighbors. A diagonal step needs both flanking edges
            // open on the source cell and both reverse edges open on the
            // destination, so it can never cut a corner past a doorless wall.
            for (vertical, horizontal) in DIAGONALS {
                if self.grid.is_blocked(current, vertical)
                    || self.grid.is_blocked(current, horizontal)
                {
                    continue;
                }
                let next = current.step(vertical).step(horizontal);
                if self.grid.is_blocked(next, vertical.opposite())
                    || self.grid.is_blocked(next, horizontal.opposite())
                {
                    continue;
                }
                if let Some(path) = self.relax(
                    &mut open,
                    current,
                    next,
                    current_cost + DIAGONAL_COST,
                    goal,
                    search_id,
                ) {
                    return path;
                }
            }
        }

        PathOutcome::NotFound
    }

    /// Relax one neighbor; returns the finished path when the goal is
    /// discovered (early exit, see module docs).
    fn relax(
        &mut self,
        open: &mut BTreeSet<OpenNode>,
        current: Pos,
        next: Pos,
        next_cost: u32,
        goal: Pos,
        search_id: u64,
    ) -> Option<PathOutcome> {
        let index = self.grid.index_of(next)?;
        let cell = &mut self.grid.cells[index];
        let stale = cell.calculation_id != search_id;
        if !stale && cell.cost <= next_cost {
            return None;
        }

        let h = heuristic(next, goal);
        cell.calculation_id = search_id;
        cell.cost = next_cost;
        cell.total_cost = next_cost + h;
        cell.prev = current;

        if next == goal {
            return Some(PathOutcome::Found(self.reconstruct(goal, search_id)));
        }

        open.insert(OpenNode { f: next_cost + h, h, y: next.y, x: next.x });
        None
    }

    fn reconstruct(&self, goal: Pos, search_id: u64) -> Vec<Pos> {
        let mut waypoints = vec![goal];
        let mut current = goal;
        loop {
            let index = self.grid.index_of(current).expect("path cells are in bounds");
            let cell = &self.grid.cells[index];
            debug_assert_eq!(cell.calculation_id, search_id);
            let prev = cell.prev;
            if prev.y < 0 {
                break;
            }
            waypoints.push(prev);
            current = prev;
        }
        waypoints.reverse();
        // Drop the start cell; callers walk from their current position.
        waypoints.remove(0);
        waypoints
    }

    fn world_to_cell(&self, world: (f32, f32)) -> Pos {
        Pos {
            y: (world.1 / self.tile_size).floor() as i32,
            x: (world.0 / self.tile_size).floor() as i32,
        }
    }

    /// Cost of a reconstructed path, for callers comparing route options.
    pub fn path_cost(path: &[Pos], start: Pos) -> u32 {
        let mut cost = 0;
        let mut current = start;
        for &next in path {
            let diagonal = next.y != current.y && next.x != current.x;
            cost += if diagonal { DIAGONAL_COST } else { CARDINAL_COST };
            current = next;
        }
        cost
    }
}

fn heuristic(from: Pos, to: Pos) -> u32 {
    let dy = (to.y - from.y) as f32;
    let dx = (to.x - from.x) as f32;
    ((dy * dy + dx * dx).sqrt() * CARDINAL_COST as f32) as u32
}
