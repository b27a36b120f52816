//! Room records, adjacency, exterior/interior door placement, and the
//! connectivity-repair pass for one building footprint.
//!
//! Rooms are the leaves of a zero-corridor split tree over the footprint, in
//! footprint-local coordinates. `connected` is geometric adjacency (the
//! candidate set for repair); `connected2` is the door graph the repair pass
//! guarantees to be fully connected.

use std::collections::VecDeque;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Dir, DirMask, GenError, GridRect, Pos};

use super::model::Door;
use super::seed::{rand_chance, rand_range};

/// Redraws allowed when a door point lands on a corner before falling back
/// to the segment midpoint.
const DOOR_POINT_RETRIES: u32 = 8;

/// Building area covered by the base exterior-door draw; every
/// `EXTRA_DOOR_AREA_STEP` cells beyond it adds one more door.
const EXTERIOR_AREA_BASELINE: i32 = 90;
const EXTRA_DOOR_AREA_STEP: i32 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Footprint-local cell bounds.
    pub bounds: GridRect,
    /// Sides of this room that border the building exterior.
    pub outside: DirMask,
    /// Indices of geometrically adjacent rooms, door or not.
    pub connected: Vec<usize>,
    /// Indices of rooms actually linked by a placed door.
    pub connected2: Vec<usize>,
}

/// Build room records from split-tree leaves and mark exterior sides
/// and geometric adjacency.
pub(super) fn build_rooms(leaves: &[GridRect], width: i32, height: i32) -> Vec<Room> {
    let mut rooms: Vec<Room> = leaves
        .iter()
        .map(|&bounds| {
            let mut outside = DirMask::EMPTY;
            if bounds.y == 0 {
                outside.insert(Dir::North);
            }
            if bounds.bottom() == height - 1 {
                outside.insert(Dir::South);
            }
            if bounds.x == 0 {
                outside.insert(Dir::West);
            }
            if bounds.right() == width - 1 {
                outside.insert(Dir::East);
            }
            Room { bounds, outside, connected: Vec::new(), connected2: Vec::new() }
        })
        .collect();

    for first in 0..rooms.len() {
        for second in (first + 1)..rooms.len() {
            if shared_wall(rooms[first].bounds, rooms[second].bounds).is_some() {
                rooms[first].connected.push(second);
                rooms[second].connected.push(first);
            }
        }
    }

    rooms
}

/// Place exterior and interior doors and guarantee the door graph connects
/// every room. Door positions are footprint-local.
pub(super) fn place_doors(
    rng: &mut ChaCha8Rng,
    rooms: &mut [Room],
    width: i32,
    height: i32,
) -> Result<Vec<Door>, GenError> {
    let mut doors = Vec::new();
    place_exterior_doors(rng, rooms, width, height, &mut doors);
    place_interior_doors(rng, rooms, &mut doors)?;
    Ok(doors)
}

fn place_exterior_doors(
    rng: &mut ChaCha8Rng,
    rooms: &[Room],
    width: i32,
    height: i32,
    doors: &mut Vec<Door>,
) {
    let area = width * height;
    let base_count = match rng.next_u32() % 10 {
        0 => 1,
        1..=4 => 2,
        5..=8 => 3,
        _ => 4,
    };
    let extra = ((area - EXTERIOR_AREA_BASELINE).max(0) / EXTRA_DOOR_AREA_STEP) as u32;
    let mut remaining = base_count + extra;

    let mut unused: Vec<DirMask> = rooms.iter().map(|room| room.outside).collect();

    while remaining > 0 {
        let candidates: Vec<usize> =
            (0..rooms.len()).filter(|&index| !unused[index].is_empty()).collect();
        if candidates.is_empty() {
            // Every outside edge already carries a door; stop early.
            break;
        }
        let room_index = candidates[rand_range(rng, 0, candidates.len() as i32 - 1) as usize];

        let sides: Vec<Dir> = unused[room_index].iter().collect();
        let side = sides[rand_range(rng, 0, sides.len() as i32 - 1) as usize];
        unused[room_index].remove(side);

        let segment = outer_edge_cells(rooms[room_index].bounds, side);
        let pos = pick_door_point(rng, &segment);
        doors.push(Door { pos, dir: side });
        remaining -= 1;
    }
}

fn place_interior_doors(
    rng: &mut ChaCha8Rng,
    rooms: &mut [Room],
    doors: &mut Vec<Door>,
) -> Result<(), GenError> {
    // Probabilistic candidate pass: each adjacent pair gets a door edge with
    // probability 1/2.
    for first in 0..rooms.len() {
        let neighbors = rooms[first].connected.clone();
        for second in neighbors {
            if second > first && rand_chance(rng, 1, 2) {
                connect2(rooms, first, second);
            }
        }
    }

    repair_connectivity(rooms)?;

    // Realize every door-graph edge as an opening at a random interior point
    // of the shared wall.
    for first in 0..rooms.len() {
        let linked = rooms[first].connected2.clone();
        for second in linked {
            if second < first {
                continue;
            }
            let (dir, segment) = shared_wall(rooms[first].bounds, rooms[second].bounds)
                .expect("connected2 rooms must share a wall");
            let pos = pick_door_point_biased(rng, &segment);
            doors.push(Door { pos, dir });
        }
    }

    Ok(())
}

/// Fixed-point repair: BFS the door graph from room 0; while unreached rooms
/// remain, link each one that has a reached geometric neighbor. Newly linked
/// rooms can reach further isolated ones, so iterate until every room is
/// visited. Only adds edges, never removes.
fn repair_connectivity(rooms: &mut [Room]) -> Result<(), GenError> {
    if rooms.is_empty() {
        return Ok(());
    }

    loop {
        let visited = reachable_from_first(rooms);
        let reached = visited.iter().filter(|&&seen| seen).count();
        if reached == rooms.len() {
            return Ok(());
        }

        let mut progress = false;
        for index in 0..rooms.len() {
            if visited[index] {
                continue;
            }
            // Deterministic pick: the first already-reached geometric neighbor.
            if let Some(&neighbor) =
                rooms[index].connected.iter().find(|&&candidate| visited[candidate])
            {
                connect2(rooms, index, neighbor);
                progress = true;
            }
        }

        if !progress {
            return Err(GenError::Disconnected { reached, total: rooms.len() });
        }
    }
}

fn reachable_from_first(rooms: &[Room]) -> Vec<bool> {
    let mut visited = vec![false; rooms.len()];
    let mut queue = VecDeque::from([0_usize]);
    visited[0] = true;
    while let Some(current) = queue.pop_front() {
        for &next in &rooms[current].connected2 {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    visited
}

fn connect2(rooms: &mut [Room], first: usize, second: usize) {
    if !rooms[first].connected2.contains(&second) {
        rooms[first].connected2.push(second);
        rooms[second].connected2.push(first);
    }
}

/// The wall shared by two edge-adjacent rooms: the direction from `a` toward
/// `b` and the cells on `a`'s side of the wall, in segment order.
pub(super) fn shared_wall(a: GridRect, b: GridRect) -> Option<(Dir, Vec<Pos>)> {
    let overlap_y = (a.y.max(b.y), a.bottom().min(b.bottom()));
    let overlap_x = (a.x.max(b.x), a.right().min(b.right()));

    if a.right() + 1 == b.x && overlap_y.0 <= overlap_y.1 {
        let cells = (overlap_y.0..=overlap_y.1).map(|y| Pos { y, x: a.right() }).collect();
        return Some((Dir::East, cells));
    }
    if b.right() + 1 == a.x && overlap_y.0 <= overlap_y.1 {
        let cells = (overlap_y.0..=overlap_y.1).map(|y| Pos { y, x: a.x }).collect();
        return Some((Dir::West, cells));
    }
    if a.bottom() + 1 == b.y && overlap_x.0 <= overlap_x.1 {
        let cells = (overlap_x.0..=overlap_x.1).map(|x| Pos { y: a.bottom(), x }).collect();
        return Some((Dir::South, cells));
    }
    if b.bottom() + 1 == a.y && overlap_x.0 <= overlap_x.1 {
        let cells = (overlap_x.0..=overlap_x.1).map(|x| Pos { y: a.y, x }).collect();
        return Some((Dir::North, cells));
    }
    None
}

/// Cells of a room edge on the building exterior, in segment order.
fn outer_edge_cells(bounds: GridRect, side: Dir) -> Vec<Pos> {
    match side {
        Dir::North => (bounds.x..=bounds.right()).map(|x| Pos { y: bounds.y, x }).collect(),
        Dir::South => (bounds.x..=bounds.right()).map(|x| Pos { y: bounds.bottom(), x }).collect(),
        Dir::West => (bounds.y..=bounds.bottom()).map(|y| Pos { y, x: bounds.x }).collect(),
        Dir::East => (bounds.y..=bounds.bottom()).map(|y| Pos { y, x: bounds.right() }).collect(),
    }
}

/// Uniform draw along the segment, redrawing on corner cells. Segments too
/// short to have an interior fall back to their midpoint.
fn pick_door_point(rng: &mut ChaCha8Rng, segment: &[Pos]) -> Pos {
    let len = segment.len();
    if len <= 2 {
        return segment[len / 2];
    }
    for _ in 0..DOOR_POINT_RETRIES {
        let index = rand_range(rng, 0, len as i32 - 1) as usize;
        if index != 0 && index != len - 1 {
            return segment[index];
        }
    }
    segment[len / 2]
}

/// Average-of-two-uniforms draw, biased toward the middle of the segment so
/// interior doors avoid corners without many redraws.
fn pick_door_point_biased(rng: &mut ChaCha8Rng, segment: &[Pos]) -> Pos {
    let len = segment.len();
    if len <= 2 {
        return segment[len / 2];
    }
    for _ in 0..DOOR_POINT_RETRIES {
        let first = rand_range(rng, 0, len as i32 - 1);
        let second = rand_range(rng, 0, len as i32 - 1);
        let index = ((first + second) / 2) as usize;
        if index != 0 && index != len - 1 {
            return segment[index];
        }
    }
    segment[len / 2]
}

#[cfg(test)]
mod tests {
    use rand_chacha::rand_core::SeedableRng;

    use crate::mapgen::split_tree::{SplitParams, SplitTree};

    use super::*;

    fn rooms_for(seed: u64, width: i32, height: i32) -> Vec<Room> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let params =
            SplitParams { min_leaf: 3, max_leaf: 8, corridor_width: 0, width, height };
        let tree = SplitTree::build(&mut rng, &params).expect("split must succeed");
        build_rooms(&tree.leaf_bounds(), width, height)
    }

    fn assert_door_graph_connected(rooms: &[Room]) {
        let visited = reachable_from_first(rooms);
        let reached = visited.iter().filter(|&&seen| seen).count();
        assert_eq!(reached, rooms.len(), "every room must be reachable through doors");
    }

    #[test]
    fn adjacency_is_symmetric_and_excludes_diagonal_touches() {
        let rooms = rooms_for(11, 20, 16);
        for (index, room) in rooms.iter().enumerate() {
            for &neighbor in &room.connected {
                assert!(rooms[neighbor].connected.contains(&index));
                let shared = shared_wall(room.bounds, rooms[neighbor].bounds);
                assert!(shared.is_some(), "connected rooms must share a wall");
            }
        }
    }

    #[test]
    fn boundary_rooms_carry_outside_flags() {
        let width = 18;
        let height = 14;
        let rooms = rooms_for(7, width, height);
        for room in &rooms {
            assert_eq!(room.bounds.y == 0, room.outside.contains(Dir::North));
            assert_eq!(room.bounds.x == 0, room.outside.contains(Dir::West));
            assert_eq!(room.bounds.bottom() == height - 1, room.outside.contains(Dir::South));
            assert_eq!(room.bounds.right() == width - 1, room.outside.contains(Dir::East));
        }
    }

    #[test]
    fn door_placement_connects_every_room() {
        for seed in [1_u64, 2, 3, 40, 99, 321, 1_024, 999_999] {
            let mut rooms = rooms_for(seed, 21, 15);
            let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0xD00D);
            place_doors(&mut rng, &mut rooms, 21, 15).expect("door placement must succeed");
            assert_door_graph_connected(&rooms);
        }
    }

    #[test]
    fn repair_links_an_isolated_room_through_geometry() {
        // Three rooms in a row; only 0-1 got a candidate door.
        let leaves = [
            GridRect { x: 0, y: 0, width: 3, height: 3 },
            GridRect { x: 3, y: 0, width: 3, height: 3 },
            GridRect { x: 6, y: 0, width: 3, height: 3 },
        ];
        let mut rooms = build_rooms(&leaves, 9, 3);
        connect2(&mut rooms, 0, 1);

        repair_connectivity(&mut rooms).expect("repair must succeed");
        assert_door_graph_connected(&rooms);
        assert!(rooms[2].connected2.contains(&1));
    }

    #[test]
    fn repair_reports_structurally_disconnected_input() {
        // Two rooms with no geometric adjacency at all.
        let leaves = [
            GridRect { x: 0, y: 0, width: 3, height: 3 },
            GridRect { x: 10, y: 10, width: 3, height: 3 },
        ];
        let mut rooms = build_rooms(&leaves, 13, 13);
        let result = repair_connectivity(&mut rooms);
        assert!(matches!(result, Err(GenError::Disconnected { reached: 1, total: 2 })));
    }

    #[test]
    fn interior_door_points_sit_on_the_shared_wall() {
        for seed in [5_u64, 17, 23] {
            let mut rooms = rooms_for(seed, 18, 18);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let doors = place_doors(&mut rng, &mut rooms, 18, 18).expect("doors must place");
            for door in &doors {
                let owner = rooms.iter().find(|room| room.bounds.contains(door.pos));
                assert!(owner.is_some(), "door {door:?} must sit inside a room");
            }
        }
    }

    #[test]
    fn door_points_avoid_corners_on_long_walls() {
        let segment: Vec<Pos> = (0..8).map(|x| Pos { y: 0, x }).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..200 {
            let picked = pick_door_point(&mut rng, &segment);
            assert!(picked.x != 0 && picked.x != 7, "corner cell picked: {picked:?}");
            let biased = pick_door_point_biased(&mut rng, &segment);
            assert!(biased.x != 0 && biased.x != 7, "corner cell picked: {biased:?}");
        }
    }
}
