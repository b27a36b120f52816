//! Procedural city generation and tile pathfinding.
//!
//! A seeded pipeline partitions the map into road-separated blocks, grows a
//! building with a connected room graph inside each block, and derives the
//! blocked-edge grid agents path over. A background worker rasterizes
//! walkable-surface tiles from the wall colliders, and the whole state
//! round-trips through checksummed JSONL save files.

pub mod mapgen;
pub mod navmesh;
pub mod pathfind;
pub mod save_file;
pub mod types;

pub use mapgen::{CityConfig, GeneratedCity, generate_city};
pub use pathfind::{PathOutcome, TilePathfinder};
