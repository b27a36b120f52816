//! Navmesh builds over real generated cities, including the interrupt /
//! save / resume cycle.

use std::thread;
use std::time::Duration;

use city_core::mapgen::{CityConfig, GeneratedCity, generate_city};
use city_core::navmesh::{
    AsyncNavmeshBuilder, BuildState, CityGeometrySource, NavmeshTileSet, TileCoord,
    TileGeometrySource,
};
use city_core::save_file::{self, NavmeshProgress, SaveState};
use city_core::types::Aabb;

const TILE_WORLD_SIZE: f32 = 8.0;

fn city_for(seed: u64) -> GeneratedCity {
    let config = CityConfig { seed, width: 64, height: 64, ..CityConfig::default() };
    generate_city(&config).expect("generation must succeed")
}

fn poll_to_completion(builder: &mut AsyncNavmeshBuilder) -> BuildState {
    for _ in 0..5_000 {
        let state = builder.poll();
        if state != BuildState::Working {
            return state;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("builder never left the working state");
}

/// Wraps a source with a per-query delay so tests can interrupt mid-build.
struct Throttled {
    inner: CityGeometrySource,
    delay: Duration,
}

impl TileGeometrySource for Throttled {
    fn bounds(&self) -> Aabb {
        self.inner.bounds()
    }

    fn gather_colliders(&self, area: &Aabb, out: &mut Vec<Aabb>) {
        thread::sleep(self.delay);
        self.inner.gather_colliders(area, out);
    }

    fn floor_height(&self, x: f32, z: f32) -> f32 {
        self.inner.floor_height(x, z)
    }
}

#[test]
fn city_build_finishes_and_walls_shape_the_tiles() {
    let city = city_for(5);
    let mut builder = AsyncNavmeshBuilder::new();
    builder.start(Box::new(CityGeometrySource::new(&city, 1.0)), TILE_WORLD_SIZE, None);

    assert_eq!(poll_to_completion(&mut builder), BuildState::Finished);
    let tiles = builder.tile_set().expect("tile set exists");
    assert_eq!(tiles.coverage(), 1.0);

    let layout = tiles.layout;
    let has_walls = layout.coords_from(None).any(|coord| {
        tiles.tile(coord).is_some_and(|tile| tile.walkable_ratio() < 1.0)
    });
    assert!(has_walls, "building walls must block some samples");
    let has_open_ground = layout.coords_from(None).any(|coord| {
        tiles.tile(coord).is_some_and(|tile| tile.walkable_ratio() > 0.5)
    });
    assert!(has_open_ground, "streets must stay mostly walkable");
}

#[test]
fn interrupted_build_resumes_through_a_save_file() {
    let city = city_for(23);

    // Interrupt a deliberately slow build once a few tiles have landed, so
    // the resume point sits past the start of the grid.
    let mut builder = AsyncNavmeshBuilder::new();
    let throttled = Throttled {
        inner: CityGeometrySource::new(&city, 1.0),
        delay: Duration::from_millis(2),
    };
    builder.start(Box::new(throttled), TILE_WORLD_SIZE, None);
    while builder.tile_set().map_or(0, NavmeshTileSet::built_count) < 3 {
        assert_eq!(builder.poll(), BuildState::Working);
        thread::sleep(Duration::from_millis(1));
    }
    builder.request_quit();
    assert_eq!(poll_to_completion(&mut builder), BuildState::Quit);
    let resume = builder.resume_coord().expect("interrupted build has a resume point");
    let (layout, built) = builder.take_tile_set().expect("tile set exists").into_tiles();
    assert!(!built.is_empty());

    // Persist map, progress, and the tiles built so far, then load into a
    // fresh session.
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("interrupted.save");
    let state = SaveState {
        seed: 23,
        map: city.map.clone(),
        navmesh: NavmeshProgress {
            done: false,
            resume_tile: Some(resume),
            layout: Some(layout),
            tiles: built,
        },
    };
    save_file::save(&path, &state).expect("save must succeed");
    let loaded = save_file::load(&path).expect("load must succeed");
    assert_eq!(loaded.navmesh.resume_tile, Some(resume));
    assert!(!loaded.navmesh.tiles.is_empty());

    // Rebuild derived state, hand the saved tiles back, and finish the
    // build from the saved coordinate.
    let restored = GeneratedCity::from_map(loaded.map, 1.0);
    let saved_layout = loaded.navmesh.layout.expect("layout saved with the tiles");
    let mut resumed = AsyncNavmeshBuilder::new();
    resumed.restore_tiles(NavmeshTileSet::from_tiles(saved_layout, loaded.navmesh.tiles));
    resumed.start(
        Box::new(CityGeometrySource::new(&restored, 1.0)),
        TILE_WORLD_SIZE,
        loaded.navmesh.resume_tile,
    );
    assert_eq!(poll_to_completion(&mut resumed), BuildState::Finished);
    assert_eq!(resumed.resume_coord(), None);

    // The new session holds every tile, including those built before the
    // interruption.
    let tiles = resumed.tile_set().expect("tile set exists");
    assert!(tiles.has_tile(TileCoord { x: 0, y: 0 }));
    assert_eq!(tiles.coverage(), 1.0);
    for coord in tiles.layout.coords_from(None) {
        assert!(tiles.has_tile(coord), "missing tile {coord:?}");
    }
}

#[test]
fn completed_build_saves_as_done() {
    let city = city_for(7);
    let mut builder = AsyncNavmeshBuilder::new();
    builder.start(Box::new(CityGeometrySource::new(&city, 1.0)), TILE_WORLD_SIZE, None);
    assert_eq!(poll_to_completion(&mut builder), BuildState::Finished);

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("done.save");
    let resume_tile = builder.resume_coord();
    let (layout, tiles) = builder.take_tile_set().expect("tile set exists").into_tiles();
    let state = SaveState {
        seed: 7,
        map: city.map,
        navmesh: NavmeshProgress { done: true, resume_tile, layout: Some(layout), tiles },
    };
    save_file::save(&path, &state).expect("save must succeed");

    let loaded = save_file::load(&path).expect("load must succeed");
    assert!(loaded.navmesh.done);
    assert_eq!(loaded.navmesh.resume_tile, None);
    assert_eq!(loaded.navmesh.tiles.len(), layout.tile_count());
}
