//! Walkable-surface tiles over the generated city, built on a background
//! thread with cooperative cancellation and save/resume support.

mod builder;
mod tiles;

pub use builder::{AsyncNavmeshBuilder, BuildState};
pub use tiles::{
    CityGeometrySource, NavmeshTile, NavmeshTileSet, TILE_CELLS, TileBuildError, TileCoord,
    TileGeometrySource, TileLayout, build_tile,
};
