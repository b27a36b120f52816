//! Tile-grid pathfinding: the per-cell blocked-edge grid and the A* search
//! that runs over it.

mod blocked_grid;
mod tile_astar;

pub use blocked_grid::BlockedEdgeGrid;
pub use tile_astar::{CARDINAL_COST, DIAGONAL_COST, PathOutcome, TilePathfinder};
