//! ASCII rendering of a city map for the terminal.

use city_core::mapgen::CityMap;
use city_core::types::{CellKind, Pos};

pub fn render_map(map: &CityMap) -> String {
    render_with_path(map, &[])
}

/// Render the map with a route overlaid as `*` cells.
pub fn render_with_path(map: &CityMap, path: &[Pos]) -> String {
    let mut out = String::with_capacity(((map.width + 1) * map.height) as usize);
    for y in 0..map.height {
        for x in 0..map.width {
            let pos = Pos { y, x };
            if path.contains(&pos) {
                out.push('*');
            } else {
                out.push(glyph(map, pos));
            }
        }
        out.push('\n');
    }
    out
}

fn glyph(map: &CityMap, pos: Pos) -> char {
    if pos == map.player_spawn {
        return '@';
    }
    if map.item_spawns.contains(&pos) {
        return '$';
    }
    if map.enemy_spawns.contains(&pos) {
        return 'z';
    }
    if has_door(map, pos) {
        return '+';
    }
    match map.cell_at(pos) {
        Some(CellKind::Road) => '=',
        Some(CellKind::Pavement) => '.',
        Some(CellKind::BuildingFloor) => '#',
        None => ' ',
    }
}

fn has_door(map: &CityMap, pos: Pos) -> bool {
    let Some((_, building)) = map.building_at(pos) else {
        return false;
    };
    let local = Pos { y: pos.y - building.bounds.y, x: pos.x - building.bounds.x };
    building.doors.iter().any(|door| door.pos == local)
}
