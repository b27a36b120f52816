//! Spawn-point selection over a generated map: the player starts on the road
//! nearest the city center, items appear inside rooms, enemies roam streets.

use rand_chacha::ChaCha8Rng;

use crate::types::{CellKind, Pos};

use super::model::CityMap;
use super::seed::{rand_chance, rand_range};

/// One enemy per this many street cells.
const ENEMY_CELL_RATIO: usize = 48;

pub(super) fn place_spawns(rng: &mut ChaCha8Rng, map: &mut CityMap) {
    map.player_spawn = pick_player_spawn(map);
    map.item_spawns = pick_item_spawns(rng, map);
    map.enemy_spawns = pick_enemy_spawns(rng, map);
}

/// The road cell nearest the grid center. Ties break on `(y, x)` so the
/// result is stable across runs.
fn pick_player_spawn(map: &CityMap) -> Pos {
    let center = Pos { y: map.height / 2, x: map.width / 2 };
    let mut best: Option<(i64, Pos)> = None;
    for y in 0..map.height {
        for x in 0..map.width {
            let pos = Pos { y, x };
            if map.cell_at(pos) != Some(CellKind::Road) {
                continue;
            }
            let dy = (pos.y - center.y) as i64;
            let dx = (pos.x - center.x) as i64;
            let candidate = (dy * dy + dx * dx, pos);
            if best.is_none_or(|current| candidate < current) {
                best = Some(candidate);
            }
        }
    }
    best.map(|(_, pos)| pos).unwrap_or(center)
}

/// Roughly one item per second room, dropped on a free floor cell.
fn pick_item_spawns(rng: &mut ChaCha8Rng, map: &CityMap) -> Vec<Pos> {
    let mut spawns = Vec::new();
    for (_, building) in &map.buildings {
        let origin = Pos { y: building.bounds.y, x: building.bounds.x };
        for room in &building.rooms {
            if !rand_chance(rng, 1, 2) {
                continue;
            }
            let local = Pos {
                y: rand_range(rng, room.bounds.y, room.bounds.bottom()),
                x: rand_range(rng, room.bounds.x, room.bounds.right()),
            };
            if building.furniture.iter().any(|piece| piece.pos == local) {
                continue;
            }
            spawns.push(Pos { y: origin.y + local.y, x: origin.x + local.x });
        }
    }
    spawns
}

/// Enemies spread over road and pavement cells, never on the player spawn.
fn pick_enemy_spawns(rng: &mut ChaCha8Rng, map: &CityMap) -> Vec<Pos> {
    let mut streets = Vec::new();
    for y in 0..map.height {
        for x in 0..map.width {
            let pos = Pos { y, x };
            if matches!(map.cell_at(pos), Some(CellKind::Road | CellKind::Pavement)) {
                streets.push(pos);
            }
        }
    }
    if streets.is_empty() {
        return Vec::new();
    }

    let target = (streets.len() / ENEMY_CELL_RATIO).max(1);
    let mut spawns = Vec::new();
    // Bounded redraw loop; collisions are rare at this density.
    for _ in 0..target * 4 {
        if spawns.len() == target {
            break;
        }
        let pos = streets[rand_range(rng, 0, streets.len() as i32 - 1) as usize];
        if pos == map.player_spawn || spawns.contains(&pos) {
            continue;
        }
        spawns.push(pos);
    }
    spawns
}
