//! Command-line front end: generate cities, inspect them, query routes, and
//! drive the background navmesh build.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use city_core::mapgen::{CityConfig, GeneratedCity, generate_city};
use city_core::navmesh::{AsyncNavmeshBuilder, BuildState, CityGeometrySource, NavmeshTileSet};
use city_core::pathfind::{PathOutcome, TilePathfinder};
use city_core::save_file::{self, NavmeshProgress, SaveState};
use city_core::types::Pos;
use clap::{Args, Parser, Subcommand};
use log::info;

mod render;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where a command gets its city: a save file, or a fresh generation.
#[derive(Args)]
struct CityArgs {
    /// Load the city from this save file instead of generating one.
    #[arg(long)]
    save: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 96)]
    width: i32,
    #[arg(long, default_value_t = 96)]
    height: i32,
}

impl CityArgs {
    fn city_and_state(&self) -> Result<(GeneratedCity, Option<SaveState>)> {
        if let Some(path) = &self.save {
            let state = save_file::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            let city = GeneratedCity::from_map(state.map.clone(), 1.0);
            return Ok((city, Some(state)));
        }
        let config = CityConfig {
            seed: self.seed,
            width: self.width,
            height: self.height,
            ..CityConfig::default()
        };
        let city = generate_city(&config).context("city generation failed")?;
        Ok((city, None))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Generate a city and optionally write it to a save file.
    Generate {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 96)]
        width: i32,
        #[arg(long, default_value_t = 96)]
        height: i32,
        /// Write the generated city here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print an ASCII view of the city.
    Show {
        #[command(flatten)]
        city: CityArgs,
    },
    /// Find a route between two grid cells and print it over the map.
    Route {
        #[command(flatten)]
        city: CityArgs,
        #[arg(long)]
        from_y: i32,
        #[arg(long)]
        from_x: i32,
        #[arg(long)]
        to_y: i32,
        #[arg(long)]
        to_x: i32,
    },
    /// Build the navmesh, resuming from saved progress when present.
    Navmesh {
        #[command(flatten)]
        city: CityArgs,
        /// World-space edge length of one navmesh tile.
        #[arg(long, default_value_t = 8.0)]
        tile_size: f32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Generate { seed, width, height, out } => run_generate(seed, width, height, out),
        Command::Show { city } => run_show(&city),
        Command::Route { city, from_y, from_x, to_y, to_x } => {
            run_route(&city, Pos { y: from_y, x: from_x }, Pos { y: to_y, x: to_x })
        }
        Command::Navmesh { city, tile_size } => run_navmesh(&city, tile_size),
    }
}

fn run_generate(seed: u64, width: i32, height: i32, out: Option<PathBuf>) -> Result<()> {
    let config = CityConfig { seed, width, height, ..CityConfig::default() };
    let city = generate_city(&config).context("city generation failed")?;
    println!(
        "seed {seed}: {} buildings, {} items, {} enemies, fingerprint {:016x}",
        city.map.buildings.len(),
        city.map.item_spawns.len(),
        city.map.enemy_spawns.len(),
        city.map.fingerprint()
    );
    if let Some(path) = out {
        let state = SaveState { seed, map: city.map, navmesh: NavmeshProgress::default() };
        save_file::save(&path, &state)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("saved to {}", path.display());
    }
    Ok(())
}

fn run_show(args: &CityArgs) -> Result<()> {
    let (city, _) = args.city_and_state()?;
    print!("{}", render::render_map(&city.map));
    Ok(())
}

fn run_route(args: &CityArgs, from: Pos, to: Pos) -> Result<()> {
    let (mut city, _) = args.city_and_state()?;
    let mut finder = TilePathfinder::new(&mut city.blocked, 1.0);
    match finder.find_cell_path(from, to) {
        PathOutcome::Found(path) => {
            let cost = TilePathfinder::path_cost(&path, from);
            println!("route of {} steps, cost {cost}:", path.len());
            print!("{}", render::render_with_path(&city.map, &path));
            Ok(())
        }
        PathOutcome::SameTile => {
            println!("start and goal share a cell; nothing to do");
            Ok(())
        }
        PathOutcome::Outside => {
            bail!("start or goal is outside the {}x{} grid", city.map.width, city.map.height)
        }
        PathOutcome::NotFound => bail!("no route from {from:?} to {to:?}"),
    }
}

fn run_navmesh(args: &CityArgs, tile_size: f32) -> Result<()> {
    let (city, state) = args.city_and_state()?;
    if let Some(state) = &state
        && state.navmesh.done
    {
        println!("navmesh already complete in this save");
        return Ok(());
    }
    let resume = state.as_ref().and_then(|state| state.navmesh.resume_tile);
    if let Some(coord) = resume {
        info!("resuming navmesh build from tile {},{}", coord.x, coord.y);
    }

    let mut builder = AsyncNavmeshBuilder::new();
    if let Some(state) = &state
        && let Some(layout) = state.navmesh.layout
    {
        builder.restore_tiles(NavmeshTileSet::from_tiles(layout, state.navmesh.tiles.clone()));
    }
    builder.start(Box::new(CityGeometrySource::new(&city, 1.0)), tile_size, resume);
    let final_state = loop {
        match builder.poll() {
            BuildState::Working => thread::sleep(Duration::from_millis(2)),
            state => break state,
        }
    };

    let tiles = builder.tile_set().context("no tile set after build")?;
    println!(
        "navmesh {final_state:?}: {} of {} tiles built",
        tiles.built_count(),
        tiles.layout.tile_count()
    );

    if let (Some(path), Some(state)) = (&args.save, state) {
        // Only a gap-free set counts as done; skipped tiles leave holes a
        // later run should retry.
        let done = final_state == BuildState::Finished
            && builder.tile_set().is_some_and(|set| set.built_count() == set.layout.tile_count());
        let resume_tile = builder.resume_coord();
        let (layout, tiles) = match builder.take_tile_set() {
            Some(set) => {
                let (layout, tiles) = set.into_tiles();
                (Some(layout), tiles)
            }
            None => (None, Vec::new()),
        };
        let updated = SaveState {
            seed: state.seed,
            map: city.map,
            navmesh: NavmeshProgress { done, resume_tile, layout, tiles },
        };
        save_file::save(path, &updated)
            .with_context(|| format!("failed to update {}", path.display()))?;
        println!("progress saved to {}", path.display());
    }
    Ok(())
}
