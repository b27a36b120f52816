//! Serializable models for the generated city: buildings, doors, furniture,
//! spawn points, and the coarse tile map.

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use xxhash_rust::xxh3::xxh3_64;

use crate::types::{CellKind, Dir, GridRect, Pos};

use super::rooms::Room;

new_key_type! {
    pub struct BuildingId;
}

/// A wall opening: the cell it sits in (footprint-local) and which edge of
/// that cell it opens. Exterior doors open toward the street.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub pos: Pos,
    pub dir: Dir,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FurnitureKind {
    Table,
    Shelf,
    Counter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Furniture {
    pub pos: Pos,
    pub kind: FurnitureKind,
}

/// One generated structure. Room and door coordinates are footprint-local;
/// `bounds` places the footprint on the city tile grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub bounds: GridRect,
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub furniture: Vec<Furniture>,
    /// Per-cell "edge E carries a door" bitmask, derived from `doors`;
    /// rebuilt rather than persisted.
    #[serde(skip)]
    door_mask: Vec<u8>,
}

impl Building {
    pub fn new(
        bounds: GridRect,
        rooms: Vec<Room>,
        doors: Vec<Door>,
        furniture: Vec<Furniture>,
    ) -> Building {
        let mut building = Building { bounds, rooms, doors, furniture, door_mask: Vec::new() };
        building.rebuild_door_mask();
        building
    }

    /// Recompute the per-cell door bitmask from the door list. Both sides of
    /// an opened interior edge are flagged so the mask can be queried from
    /// either cell.
    pub fn rebuild_door_mask(&mut self) {
        let width = self.bounds.width;
        let height = self.bounds.height;
        self.door_mask = vec![0; (width * height) as usize];
        let doors = self.doors.clone();
        for door in doors {
            self.set_door_bit(door.pos, door.dir);
            let neighbor = door.pos.step(door.dir);
            if self.in_local_bounds(neighbor) {
                self.set_door_bit(neighbor, door.dir.opposite());
            }
        }
    }

    /// Does edge `dir` of footprint-local cell `pos` carry a door?
    pub fn door_at(&self, pos: Pos, dir: Dir) -> bool {
        if !self.in_local_bounds(pos) {
            return false;
        }
        self.door_mask[self.local_index(pos)] & dir.bit() != 0
    }

    pub fn in_local_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.bounds.width && pos.y < self.bounds.height
    }

    /// Index of the room containing a footprint-local cell.
    pub fn room_index_at(&self, pos: Pos) -> Option<usize> {
        self.rooms.iter().position(|room| room.bounds.contains(pos))
    }

    fn set_door_bit(&mut self, pos: Pos, dir: Dir) {
        let index = self.local_index(pos);
        self.door_mask[index] |= dir.bit();
    }

    fn local_index(&self, pos: Pos) -> usize {
        (pos.y * self.bounds.width + pos.x) as usize
    }
}

/// The generated city: tile map, building arena, and spawn points.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CityMap {
    pub width: i32,
    pub height: i32,
    pub cells: Vec<CellKind>,
    pub buildings: SlotMap<BuildingId, Building>,
    pub player_spawn: Pos,
    pub item_spawns: Vec<Pos>,
    pub enemy_spawns: Vec<Pos>,
}

impl CityMap {
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn cell_at(&self, pos: Pos) -> Option<CellKind> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[(pos.y * self.width + pos.x) as usize])
    }

    /// The building whose footprint contains a city-grid cell.
    pub fn building_at(&self, pos: Pos) -> Option<(BuildingId, &Building)> {
        self.buildings.iter().find(|(_, building)| building.bounds.contains(pos))
    }

    /// Rebuild every derived field after deserialization.
    pub fn rebuild_derived(&mut self) {
        for (_, building) in self.buildings.iter_mut() {
            building.rebuild_door_mask();
        }
    }

    /// 64-bit fingerprint of the canonical encoding; two maps with equal
    /// fingerprints are the same city for all practical purposes.
    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }

    /// Canonical byte encoding for fingerprinting generated output.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(self.width.to_le_bytes());
        bytes.extend(self.height.to_le_bytes());
        for cell in &self.cells {
            bytes.push(match cell {
                CellKind::Road => 0,
                CellKind::Pavement => 1,
                CellKind::BuildingFloor => 2,
            });
        }

        bytes.extend((self.buildings.len() as u32).to_le_bytes());
        for (_, building) in &self.buildings {
            push_rect(&mut bytes, building.bounds);
            bytes.extend((building.rooms.len() as u32).to_le_bytes());
            for room in &building.rooms {
                push_rect(&mut bytes, room.bounds);
                bytes.push(room.outside.0);
            }
            bytes.extend((building.doors.len() as u32).to_le_bytes());
            for door in &building.doors {
                push_pos(&mut bytes, door.pos);
                bytes.push(door.dir.bit());
            }
            bytes.extend((building.furniture.len() as u32).to_le_bytes());
            for piece in &building.furniture {
                push_pos(&mut bytes, piece.pos);
                bytes.push(match piece.kind {
                    FurnitureKind::Table => 0,
                    FurnitureKind::Shelf => 1,
                    FurnitureKind::Counter => 2,
                });
            }
        }

        push_pos(&mut bytes, self.player_spawn);
        bytes.extend((self.item_spawns.len() as u32).to_le_bytes());
        for spawn in &self.item_spawns {
            push_pos(&mut bytes, *spawn);
        }
        bytes.extend((self.enemy_spawns.len() as u32).to_le_bytes());
        for spawn in &self.enemy_spawns {
            push_pos(&mut bytes, *spawn);
        }

        bytes
    }
}

fn push_rect(bytes: &mut Vec<u8>, rect: GridRect) {
    bytes.extend(rect.x.to_le_bytes());
    bytes.extend(rect.y.to_le_bytes());
    bytes.extend(rect.width.to_le_bytes());
    bytes.extend(rect.height.to_le_bytes());
}

fn push_pos(bytes: &mut Vec<u8>, pos: Pos) {
    bytes.extend(pos.y.to_le_bytes());
    bytes.extend(pos.x.to_le_bytes());
}
