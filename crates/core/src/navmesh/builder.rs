//! Background navmesh construction.
//!
//! One worker thread rasterizes tiles in row-major order and hands each
//! finished tile back over a channel. Cancellation is cooperative: the worker
//! checks a flag between tiles, so a quit request never tears a tile and is
//! honored within one tile's build time. The packed coordinate of the next
//! unbuilt tile is published for save/resume.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Instant;

use log::{info, warn};

use super::tiles::{
    NavmeshTile, NavmeshTileSet, TileCoord, TileGeometrySource, TileLayout, build_tile,
};

const STATE_NOT_STARTED: u8 = 0;
const STATE_WORKING: u8 = 1;
const STATE_FINISHED: u8 = 2;
const STATE_QUIT: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    Working,
    /// Every tile in the layout was visited.
    Finished,
    /// The worker stopped early on a quit request.
    Quit,
}

struct Shared {
    state: AtomicU8,
    quit_requested: AtomicBool,
    /// Packed [`TileCoord`] of the next unbuilt tile.
    next_tile: AtomicU32,
}

/// Owns the worker thread and accumulates its output. `poll` regularly from
/// the main loop; `request_quit` before dropping a build mid-flight.
pub struct AsyncNavmeshBuilder {
    shared: Arc<Shared>,
    tiles: Option<NavmeshTileSet>,
    receiver: Option<mpsc::Receiver<NavmeshTile>>,
    worker: Option<thread::JoinHandle<()>>,
    started_at: Option<Instant>,
    ever_started: bool,
}

impl AsyncNavmeshBuilder {
    pub fn new() -> AsyncNavmeshBuilder {
        AsyncNavmeshBuilder {
            shared: Arc::new(Shared {
                state: AtomicU8::new(STATE_NOT_STARTED),
                quit_requested: AtomicBool::new(false),
                next_tile: AtomicU32::new(0),
            }),
            tiles: None,
            receiver: None,
            worker: None,
            started_at: None,
            ever_started: false,
        }
    }

    /// Kick off a build. Tiles already held from an earlier run over the same
    /// layout are kept, so resuming only builds what is missing.
    pub fn start(
        &mut self,
        source: Box<dyn TileGeometrySource>,
        tile_world_size: f32,
        resume_from: Option<TileCoord>,
    ) {
        if self.state() == BuildState::Working {
            warn!("navmesh build already running, start ignored");
            return;
        }
        // Reap a finished-but-unjoined worker before spawning a new one.
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
            self.drain();
        }

        let layout = TileLayout::for_bounds(&source.bounds(), tile_world_size);
        let tiles = match self.tiles.take() {
            Some(existing) if existing.layout == layout => existing,
            _ => NavmeshTileSet::new(layout),
        };
        self.tiles = Some(tiles);

        let first = resume_from.unwrap_or(TileCoord { x: 0, y: 0 });
        self.shared.quit_requested.store(false, Ordering::SeqCst);
        self.shared.next_tile.store(first.pack(), Ordering::SeqCst);
        self.shared.state.store(STATE_WORKING, Ordering::SeqCst);

        let (sender, receiver) = mpsc::channel();
        self.receiver = Some(receiver);
        self.started_at = Some(Instant::now());
        self.ever_started = true;

        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || {
            build_worker(source, layout, resume_from, &shared, &sender);
        }));
        info!(
            "navmesh build started: {}x{} tiles from {},{}",
            layout.tiles_x, layout.tiles_y, first.x, first.y
        );
    }

    pub fn state(&self) -> BuildState {
        match self.shared.state.load(Ordering::SeqCst) {
            STATE_WORKING => BuildState::Working,
            STATE_FINISHED => BuildState::Finished,
            STATE_QUIT => BuildState::Quit,
            _ => BuildState::NotStarted,
        }
    }

    /// Ask the worker to stop after the tile it is on. Returns immediately.
    pub fn request_quit(&self) {
        self.shared.quit_requested.store(true, Ordering::SeqCst);
    }

    /// Drain finished tiles into the set and reap the worker once it exits.
    pub fn poll(&mut self) -> BuildState {
        self.drain();
        let state = self.state();
        if matches!(state, BuildState::Finished | BuildState::Quit)
            && let Some(handle) = self.worker.take()
        {
            if handle.join().is_err() {
                warn!("navmesh worker panicked");
            }
            // Tiles sent between the last drain and worker exit.
            self.drain();
            self.receiver = None;
            if let Some(started) = self.started_at.take() {
                let built = self.tiles.as_ref().map_or(0, NavmeshTileSet::built_count);
                info!("navmesh build {state:?}: {built} tiles in {:.2?}", started.elapsed());
            }
        }
        state
    }

    /// Where a restarted build should pick up. `None` when nothing is left
    /// to do or no build ever ran.
    pub fn resume_coord(&self) -> Option<TileCoord> {
        if !self.ever_started || self.state() == BuildState::Finished {
            return None;
        }
        Some(TileCoord::unpack(self.shared.next_tile.load(Ordering::SeqCst)))
    }

    pub fn tile_set(&self) -> Option<&NavmeshTileSet> {
        self.tiles.as_ref()
    }

    pub fn take_tile_set(&mut self) -> Option<NavmeshTileSet> {
        self.tiles.take()
    }

    /// Hand back tiles recovered from a save, so a resumed build keeps the
    /// work done before the interruption. Ignored while a build is running;
    /// `start` replaces the set anyway if the layout no longer matches.
    pub fn restore_tiles(&mut self, set: NavmeshTileSet) {
        if self.state() == BuildState::Working {
            warn!("navmesh build running, restored tiles ignored");
            return;
        }
        self.tiles = Some(set);
    }

    /// Stop any in-flight build, reap the worker, and return to
    /// `NotStarted`. The tile set and resume coordinate survive.
    pub fn shutdown(&mut self) {
        self.request_quit();
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            warn!("navmesh worker panicked");
        }
        self.drain();
        self.receiver = None;
        self.started_at = None;
        self.shared.state.store(STATE_NOT_STARTED, Ordering::SeqCst);
        self.shared.quit_requested.store(false, Ordering::SeqCst);
    }

    fn drain(&mut self) {
        if let (Some(receiver), Some(tiles)) = (&self.receiver, &mut self.tiles) {
            for tile in receiver.try_iter() {
                tiles.insert(tile);
            }
        }
    }
}

impl Default for AsyncNavmeshBuilder {
    fn default() -> AsyncNavmeshBuilder {
        AsyncNavmeshBuilder::new()
    }
}

impl Drop for AsyncNavmeshBuilder {
    fn drop(&mut self) {
        self.request_quit();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn build_worker(
    source: Box<dyn TileGeometrySource>,
    layout: TileLayout,
    resume_from: Option<TileCoord>,
    shared: &Shared,
    sender: &mpsc::Sender<NavmeshTile>,
) {
    for coord in layout.coords_from(resume_from) {
        // Publish before checking so an interrupt leaves this tile as the
        // resume point.
        shared.next_tile.store(coord.pack(), Ordering::SeqCst);
        if shared.quit_requested.load(Ordering::SeqCst) {
            shared.state.store(STATE_QUIT, Ordering::SeqCst);
            return;
        }
        match build_tile(source.as_ref(), layout, coord) {
            Ok(tile) => {
                if sender.send(tile).is_err() {
                    // Receiver dropped; nobody wants the rest.
                    shared.state.store(STATE_QUIT, Ordering::SeqCst);
                    return;
                }
            }
            Err(err) => warn!("skipping navmesh tile {},{}: {err}", coord.x, coord.y),
        }
    }
    shared.state.store(STATE_FINISHED, Ordering::SeqCst);
}
