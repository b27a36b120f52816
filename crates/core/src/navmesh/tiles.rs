//! Walkable-surface tiles rasterized from wall colliders.
//!
//! The world is covered by a fixed grid of square tiles; each tile is cut
//! into `TILE_CELLS` x `TILE_CELLS` sample cells, and a cell is unwalkable
//! when any collider overlaps its footprint. Tiles are built one at a time
//! so the async builder can stop between them without tearing a
//! half-finished tile.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapgen::GeneratedCity;
use crate::types::Aabb;

/// Walkability samples per tile side.
pub const TILE_CELLS: i32 = 8;

/// Position of a tile in the build grid. Packs into a `u32` for the
/// builder's resume coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u16,
    pub y: u16,
}

impl TileCoord {
    pub fn pack(self) -> u32 {
        (u32::from(self.y) << 16) | u32::from(self.x)
    }

    pub fn unpack(packed: u32) -> TileCoord {
        TileCoord { x: (packed & 0xFFFF) as u16, y: (packed >> 16) as u16 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileBuildError {
    /// The tile's world box collapsed to a line or point.
    DegenerateBounds { coord: TileCoord },
    /// The geometry source reported a non-finite floor height.
    BadFloorHeight { coord: TileCoord },
}

impl fmt::Display for TileBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateBounds { coord } => {
                write!(f, "tile {},{} has a degenerate world box", coord.x, coord.y)
            }
            Self::BadFloorHeight { coord } => {
                write!(f, "tile {},{} sampled a non-finite floor height", coord.x, coord.y)
            }
        }
    }
}

impl std::error::Error for TileBuildError {}

/// Geometry queries the tile builder needs. Implementations are handed to a
/// worker thread, so they must be `Send`.
pub trait TileGeometrySource: Send {
    /// World-space bounds of all geometry to cover.
    fn bounds(&self) -> Aabb;

    /// Append every collider overlapping `area` to `out`.
    fn gather_colliders(&self, area: &Aabb, out: &mut Vec<Aabb>);

    /// Walkable floor height at a world position.
    fn floor_height(&self, x: f32, z: f32) -> f32;
}

/// Snapshot of a generated city's walls, detached from the city itself so
/// the builder thread does not borrow it.
pub struct CityGeometrySource {
    bounds: Aabb,
    colliders: Vec<Aabb>,
}

impl CityGeometrySource {
    pub fn new(city: &GeneratedCity, tile_size: f32) -> CityGeometrySource {
        CityGeometrySource {
            bounds: city.world_bounds(tile_size),
            colliders: city.colliders.clone(),
        }
    }
}

impl TileGeometrySource for CityGeometrySource {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn gather_colliders(&self, area: &Aabb, out: &mut Vec<Aabb>) {
        out.extend(self.colliders.iter().filter(|wall| wall.intersects_xz(area)));
    }

    fn floor_height(&self, _x: f32, _z: f32) -> f32 {
        // Streets and floors sit on one ground plane.
        0.0
    }
}

/// How the tile grid covers the world: origin, tile edge length, and grid
/// dimensions. Small and `Copy` so the worker thread can carry its own.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileLayout {
    pub origin_x: f32,
    pub origin_z: f32,
    pub tile_world_size: f32,
    pub tiles_x: u16,
    pub tiles_y: u16,
}

impl TileLayout {
    pub fn for_bounds(bounds: &Aabb, tile_world_size: f32) -> TileLayout {
        let span_x = (bounds.max_x - bounds.min_x).max(0.0);
        let span_z = (bounds.max_z - bounds.min_z).max(0.0);
        TileLayout {
            origin_x: bounds.min_x,
            origin_z: bounds.min_z,
            tile_world_size,
            tiles_x: (span_x / tile_world_size).ceil().max(1.0) as u16,
            tiles_y: (span_z / tile_world_size).ceil().max(1.0) as u16,
        }
    }

    pub fn tile_count(&self) -> usize {
        usize::from(self.tiles_x) * usize::from(self.tiles_y)
    }

    pub fn in_range(&self, coord: TileCoord) -> bool {
        coord.x < self.tiles_x && coord.y < self.tiles_y
    }

    /// World box covered by one tile.
    pub fn box_for_tile(&self, coord: TileCoord) -> Aabb {
        let min_x = self.origin_x + f32::from(coord.x) * self.tile_world_size;
        let min_z = self.origin_z + f32::from(coord.y) * self.tile_world_size;
        Aabb {
            min_x,
            min_y: f32::MIN,
            min_z,
            max_x: min_x + self.tile_world_size,
            max_y: f32::MAX,
            max_z: min_z + self.tile_world_size,
        }
    }

    /// Row-major walk of the grid, starting at `resume` when given.
    pub fn coords_from(self, resume: Option<TileCoord>) -> impl Iterator<Item = TileCoord> {
        let tiles_x = u32::from(self.tiles_x);
        let start = resume
            .map_or(0, |coord| u32::from(coord.y) * tiles_x + u32::from(coord.x))
            .min(self.tile_count() as u32);
        (start..self.tile_count() as u32).map(move |index| TileCoord {
            x: (index % tiles_x) as u16,
            y: (index / tiles_x) as u16,
        })
    }
}

/// One finished tile: a row-major walkability bitmap over its world box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavmeshTile {
    pub coord: TileCoord,
    pub floor_height: f32,
    pub walkable: Vec<bool>,
}

impl NavmeshTile {
    pub fn walkable_ratio(&self) -> f32 {
        if self.walkable.is_empty() {
            return 0.0;
        }
        let open = self.walkable.iter().filter(|&&sample| sample).count();
        open as f32 / self.walkable.len() as f32
    }
}

/// The accumulated tiles of one build, keyed by grid coordinate.
#[derive(Clone, Debug)]
pub struct NavmeshTileSet {
    pub layout: TileLayout,
    tiles: HashMap<TileCoord, NavmeshTile>,
}

impl NavmeshTileSet {
    pub fn new(layout: TileLayout) -> NavmeshTileSet {
        NavmeshTileSet { layout, tiles: HashMap::new() }
    }

    /// Rebuild a set from tiles recovered from a save. Tiles that fall
    /// outside the layout are dropped.
    pub fn from_tiles(layout: TileLayout, tiles: Vec<NavmeshTile>) -> NavmeshTileSet {
        let mut set = NavmeshTileSet::new(layout);
        for tile in tiles {
            if layout.in_range(tile.coord) {
                set.tiles.insert(tile.coord, tile);
            }
        }
        set
    }

    /// Break the set into its layout and built tiles, in row-major order,
    /// for persistence.
    pub fn into_tiles(self) -> (TileLayout, Vec<NavmeshTile>) {
        let mut tiles: Vec<NavmeshTile> = self.tiles.into_values().collect();
        tiles.sort_by_key(|tile| (tile.coord.y, tile.coord.x));
        (self.layout, tiles)
    }

    pub fn insert(&mut self, tile: NavmeshTile) {
        debug_assert!(self.layout.in_range(tile.coord));
        self.tiles.insert(tile.coord, tile);
    }

    pub fn has_tile(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&NavmeshTile> {
        self.tiles.get(&coord)
    }

    pub fn built_count(&self) -> usize {
        self.tiles.len()
    }

    /// Fraction of the grid that has a built tile.
    pub fn coverage(&self) -> f32 {
        self.tiles.len() as f32 / self.layout.tile_count() as f32
    }
}

/// Rasterize one tile. Fails without touching the set; the builder skips
/// failed tiles and keeps going.
pub fn build_tile(
    source: &dyn TileGeometrySource,
    layout: TileLayout,
    coord: TileCoord,
) -> Result<NavmeshTile, TileBuildError> {
    let area = layout.box_for_tile(coord);
    if area.is_degenerate() {
        return Err(TileBuildError::DegenerateBounds { coord });
    }

    let center_x = (area.min_x + area.max_x) / 2.0;
    let center_z = (area.min_z + area.max_z) / 2.0;
    let floor_height = source.floor_height(center_x, center_z);
    if !floor_height.is_finite() {
        return Err(TileBuildError::BadFloorHeight { coord });
    }

    let mut colliders = Vec::new();
    source.gather_colliders(&area, &mut colliders);

    let step = layout.tile_world_size / TILE_CELLS as f32;
    let mut walkable = Vec::with_capacity((TILE_CELLS * TILE_CELLS) as usize);
    for row in 0..TILE_CELLS {
        for col in 0..TILE_CELLS {
            // Overlap-test the whole sample cell, not its center point:
            // walls are thinner than `step` and would slip between points.
            let cell = Aabb {
                min_x: area.min_x + col as f32 * step,
                min_y: area.min_y,
                min_z: area.min_z + row as f32 * step,
                max_x: area.min_x + (col as f32 + 1.0) * step,
                max_y: area.max_y,
                max_z: area.min_z + (row as f32 + 1.0) * step,
            };
            let blocked = colliders.iter().any(|wall| wall.intersects_xz(&cell));
            walkable.push(!blocked);
        }
    }

    Ok(NavmeshTile { coord, floor_height, walkable })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneWallSource;

    impl TileGeometrySource for OneWallSource {
        fn bounds(&self) -> Aabb {
            Aabb { min_x: 0.0, min_y: 0.0, min_z: 0.0, max_x: 16.0, max_y: 2.5, max_z: 16.0 }
        }

        fn gather_colliders(&self, area: &Aabb, out: &mut Vec<Aabb>) {
            let wall = Aabb {
                min_x: 3.9,
                min_y: 0.0,
                min_z: 0.0,
                max_x: 4.1,
                max_y: 2.5,
                max_z: 16.0,
            };
            if wall.intersects_xz(area) {
                out.push(wall);
            }
        }

        fn floor_height(&self, _x: f32, _z: f32) -> f32 {
            0.0
        }
    }

    #[test]
    fn coord_packing_round_trips() {
        let coord = TileCoord { x: 513, y: 7 };
        assert_eq!(TileCoord::unpack(coord.pack()), coord);
        assert_eq!(TileCoord::unpack(0), TileCoord { x: 0, y: 0 });
    }

    #[test]
    fn layout_covers_bounds_with_ceil_division() {
        let layout = TileLayout::for_bounds(&OneWallSource.bounds(), 5.0);
        assert_eq!((layout.tiles_x, layout.tiles_y), (4, 4));
        assert_eq!(layout.tile_count(), 16);
        let last = layout.box_for_tile(TileCoord { x: 3, y: 3 });
        assert!(last.max_x >= 16.0 && last.max_z >= 16.0);
    }

    #[test]
    fn coords_walk_row_major_from_resume_point() {
        let layout = TileLayout::for_bounds(&OneWallSource.bounds(), 8.0);
        let all: Vec<TileCoord> = layout.coords_from(None).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], TileCoord { x: 0, y: 0 });
        assert_eq!(all[1], TileCoord { x: 1, y: 0 });
        let rest: Vec<TileCoord> = layout.coords_from(Some(TileCoord { x: 1, y: 1 })).collect();
        assert_eq!(rest, vec![TileCoord { x: 1, y: 1 }]);
    }

    #[test]
    fn wall_samples_come_back_unwalkable() {
        // The wall is 0.2 units thick, far thinner than the 1.0-unit sample
        // cells; it must still block the cells whose footprint it crosses.
        let layout = TileLayout::for_bounds(&OneWallSource.bounds(), 8.0);
        let tile = build_tile(&OneWallSource, layout, TileCoord { x: 0, y: 0 })
            .expect("tile must build");
        assert!(tile.walkable_ratio() < 1.0, "the wall must block some samples");
        assert!(tile.walkable_ratio() > 0.5, "most of the tile is open ground");
        for row in 0..TILE_CELLS as usize {
            assert!(!tile.walkable[row * TILE_CELLS as usize + 3]);
            assert!(tile.walkable[row * TILE_CELLS as usize + 6]);
        }

        let open = build_tile(&OneWallSource, layout, TileCoord { x: 1, y: 1 })
            .expect("tile must build");
        assert_eq!(open.walkable_ratio(), 1.0);
    }

    #[test]
    fn non_finite_floor_height_fails_the_tile() {
        struct BrokenFloor;
        impl TileGeometrySource for BrokenFloor {
            fn bounds(&self) -> Aabb {
                OneWallSource.bounds()
            }
            fn gather_colliders(&self, _area: &Aabb, _out: &mut Vec<Aabb>) {}
            fn floor_height(&self, _x: f32, _z: f32) -> f32 {
                f32::NAN
            }
        }
        let layout = TileLayout::for_bounds(&BrokenFloor.bounds(), 8.0);
        let result = build_tile(&BrokenFloor, layout, TileCoord { x: 0, y: 0 });
        assert_eq!(result, Err(TileBuildError::BadFloorHeight { coord: TileCoord { x: 0, y: 0 } }));
    }

    #[test]
    fn tile_set_tracks_coverage() {
        let layout = TileLayout::for_bounds(&OneWallSource.bounds(), 8.0);
        let mut set = NavmeshTileSet::new(layout);
        assert_eq!(set.coverage(), 0.0);
        let coord = TileCoord { x: 0, y: 1 };
        let tile = build_tile(&OneWallSource, layout, coord).expect("tile must build");
        set.insert(tile);
        assert!(set.has_tile(coord));
        assert!(!set.has_tile(TileCoord { x: 1, y: 1 }));
        assert_eq!(set.built_count(), 1);
        assert_eq!(set.coverage(), 0.25);
    }
}
