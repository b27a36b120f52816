//! Top-level generation pipeline: partition the city into blocks, grow a
//! building inside each block, furnish it, pick spawns, and derive the
//! blocked-edge grid plus world-space wall colliders.

use log::{debug, info};
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::pathfind::BlockedEdgeGrid;
use crate::types::{Aabb, CellKind, Dir, GenError, GridRect, Pos};

use super::model::{Building, CityMap, Furniture, FurnitureKind};
use super::rooms::{Room, build_rooms, place_doors};
use super::seed::{derive_building_seed, mix_seed_stream, rand_chance, rand_range};
use super::spawns::place_spawns;
use super::split_tree::{SplitParams, SplitTree};

/// Independent RNG streams so layout draws never shift spawn draws.
const LAYOUT_STREAM: u64 = 0;
const SPAWN_STREAM: u64 = 1;

const WALL_THICKNESS: f32 = 0.2;
const WALL_HEIGHT: f32 = 2.5;

#[derive(Clone, Copy, Debug)]
pub struct CityConfig {
    pub seed: u64,
    pub width: i32,
    pub height: i32,
    /// Corridor width of the city-scale partition, in cells.
    pub road_width: i32,
    pub block_min: i32,
    pub block_max: i32,
    pub room_min: i32,
    pub room_max: i32,
    /// World-space edge length of one grid cell.
    pub tile_size: f32,
}

impl Default for CityConfig {
    fn default() -> CityConfig {
        CityConfig {
            seed: 0,
            width: 96,
            height: 96,
            road_width: 3,
            block_min: 12,
            block_max: 30,
            room_min: 3,
            room_max: 8,
            tile_size: 1.0,
        }
    }
}

/// A finished city: the serializable map plus data derived from it.
#[derive(Clone, Debug)]
pub struct GeneratedCity {
    pub map: CityMap,
    pub blocked: BlockedEdgeGrid,
    pub colliders: Vec<Aabb>,
}

impl GeneratedCity {
    /// Rebuild derived state around a map that came out of a save file.
    pub fn from_map(mut map: CityMap, tile_size: f32) -> GeneratedCity {
        map.rebuild_derived();
        let blocked = BlockedEdgeGrid::derive(&map);
        let colliders = emit_wall_colliders(&blocked, tile_size);
        GeneratedCity { map, blocked, colliders }
    }

    /// World-space bounds of the whole grid at `tile_size` cell length.
    pub fn world_bounds(&self, tile_size: f32) -> Aabb {
        Aabb {
            min_x: 0.0,
            min_y: 0.0,
            min_z: 0.0,
            max_x: self.map.width as f32 * tile_size,
            max_y: WALL_HEIGHT,
            max_z: self.map.height as f32 * tile_size,
        }
    }
}

/// Run the full pipeline. Identical configs produce identical cities.
pub fn generate_city(config: &CityConfig) -> Result<GeneratedCity, GenError> {
    if config.width < 1 || config.height < 1 {
        return Err(GenError::EmptyLayout { width: config.width, height: config.height });
    }
    info!("generating {}x{} city, seed {}", config.width, config.height, config.seed);

    let mut layout_rng = ChaCha8Rng::seed_from_u64(mix_seed_stream(config.seed, LAYOUT_STREAM));
    let block_params = SplitParams {
        min_leaf: config.block_min,
        max_leaf: config.block_max,
        corridor_width: config.road_width,
        width: config.width,
        height: config.height,
    };
    let blocks = SplitTree::build(&mut layout_rng, &block_params)?;

    let mut map = CityMap {
        width: config.width,
        height: config.height,
        cells: vec![CellKind::Road; (config.width * config.height) as usize],
        buildings: SlotMap::with_key(),
        player_spawn: Pos { y: 0, x: 0 },
        item_spawns: Vec::new(),
        enemy_spawns: Vec::new(),
    };

    let mut building_index = 0_u64;
    for block in blocks.leaf_bounds() {
        fill_cells(&mut map, block, CellKind::Pavement);

        // One-cell pavement ring around every footprint.
        let Some(footprint) = block.shrunk(1) else { continue };
        if footprint.width < config.room_min || footprint.height < config.room_min {
            continue;
        }

        let building_seed = derive_building_seed(config.seed, building_index);
        building_index += 1;
        let mut building_rng = ChaCha8Rng::seed_from_u64(building_seed);
        let building = build_building(&mut building_rng, footprint, config)?;
        fill_cells(&mut map, footprint, CellKind::BuildingFloor);
        map.buildings.insert(building);
    }

    if map.buildings.is_empty() {
        return Err(GenError::EmptyLayout { width: config.width, height: config.height });
    }

    let mut spawn_rng = ChaCha8Rng::seed_from_u64(mix_seed_stream(config.seed, SPAWN_STREAM));
    place_spawns(&mut spawn_rng, &mut map);

    let blocked = BlockedEdgeGrid::derive(&map);
    let colliders = emit_wall_colliders(&blocked, config.tile_size);
    info!("generated {} buildings, {} wall colliders", map.buildings.len(), colliders.len());

    Ok(GeneratedCity { map, blocked, colliders })
}

fn build_building(
    rng: &mut ChaCha8Rng,
    footprint: GridRect,
    config: &CityConfig,
) -> Result<Building, GenError> {
    let params = SplitParams {
        min_leaf: config.room_min,
        max_leaf: config.room_max,
        corridor_width: 0,
        width: footprint.width,
        height: footprint.height,
    };
    let tree = SplitTree::build(rng, &params)?;
    let mut rooms = build_rooms(&tree.leaf_bounds(), footprint.width, footprint.height);
    let doors = place_doors(rng, &mut rooms, footprint.width, footprint.height)?;
    let furniture = place_furniture(rng, &rooms);
    debug!(
        "building at {},{}: {} rooms, {} doors, {} furniture",
        footprint.x,
        footprint.y,
        rooms.len(),
        doors.len(),
        furniture.len()
    );
    Ok(Building::new(footprint, rooms, doors, furniture))
}

/// Scatter furniture over room interiors. Interiors exclude wall-adjacent
/// cells, so pieces never sit in front of a door.
fn place_furniture(rng: &mut ChaCha8Rng, rooms: &[Room]) -> Vec<Furniture> {
    let mut placed = Vec::new();
    for room in rooms {
        let Some(interior) = room.bounds.shrunk(1) else { continue };
        if !rand_chance(rng, 2, 3) {
            continue;
        }
        let count = rand_range(rng, 1, (interior.area() / 4).clamp(1, 3));
        for _ in 0..count {
            let pos = Pos {
                y: rand_range(rng, interior.y, interior.bottom()),
                x: rand_range(rng, interior.x, interior.right()),
            };
            if placed.iter().any(|piece: &Furniture| piece.pos == pos) {
                continue;
            }
            let kind = match rng.next_u32() % 3 {
                0 => FurnitureKind::Table,
                1 => FurnitureKind::Shelf,
                _ => FurnitureKind::Counter,
            };
            placed.push(Furniture { pos, kind });
        }
    }
    placed
}

/// One thin box per blocked edge. Each interior edge is stored on both of its
/// cells, so only east and south edges are scanned to avoid duplicates; the
/// grid border itself gets no collider.
fn emit_wall_colliders(blocked: &BlockedEdgeGrid, tile_size: f32) -> Vec<Aabb> {
    let mut walls = Vec::new();
    for y in 0..blocked.height() {
        for x in 0..blocked.width() {
            let pos = Pos { y, x };
            if x + 1 < blocked.width() && blocked.is_blocked(pos, Dir::East) {
                let plane_x = (x + 1) as f32 * tile_size;
                walls.push(Aabb {
                    min_x: plane_x - WALL_THICKNESS / 2.0,
                    min_y: 0.0,
                    min_z: y as f32 * tile_size,
                    max_x: plane_x + WALL_THICKNESS / 2.0,
                    max_y: WALL_HEIGHT,
                    max_z: (y + 1) as f32 * tile_size,
                });
            }
            if y + 1 < blocked.height() && blocked.is_blocked(pos, Dir::South) {
                let plane_z = (y + 1) as f32 * tile_size;
                walls.push(Aabb {
                    min_x: x as f32 * tile_size,
                    min_y: 0.0,
                    min_z: plane_z - WALL_THICKNESS / 2.0,
                    max_x: (x + 1) as f32 * tile_size,
                    max_y: WALL_HEIGHT,
                    max_z: plane_z + WALL_THICKNESS / 2.0,
                });
            }
        }
    }
    walls
}

fn fill_cells(map: &mut CityMap, rect: GridRect, kind: CellKind) {
    for y in rect.y..=rect.bottom() {
        for x in rect.x..=rect.right() {
            map.cells[(y * map.width + x) as usize] = kind;
        }
    }
}
