//! Procedural city generation: block partitioning, buildings with connected
//! room graphs, furniture, spawn points, and wall colliders.

mod generator;
mod model;
mod rooms;
mod seed;
mod spawns;
mod split_tree;

pub use generator::{CityConfig, GeneratedCity, generate_city};
pub use model::{Building, BuildingId, CityMap, Door, Furniture, FurnitureKind};
pub use rooms::Room;
pub use split_tree::{SplitParams, SplitTree};
