//! End-to-end generation properties: determinism, layout structure, and
//! walkability from the player spawn to every item.

use std::collections::HashSet;

use city_core::mapgen::{CityConfig, GeneratedCity, generate_city};
use city_core::pathfind::{PathOutcome, TilePathfinder};
use city_core::types::CellKind;
use proptest::prelude::*;

fn small_config(seed: u64) -> CityConfig {
    CityConfig { seed, width: 48, height: 48, ..CityConfig::default() }
}

fn unreachable_items(city: &GeneratedCity) -> Vec<city_core::types::Pos> {
    let mut blocked = city.blocked.clone();
    let mut finder = TilePathfinder::new(&mut blocked, 1.0);
    let start = city.map.player_spawn;
    city.map
        .item_spawns
        .iter()
        .copied()
        .filter(|&goal| {
            !matches!(
                finder.find_cell_path(start, goal),
                PathOutcome::Found(_) | PathOutcome::SameTile
            )
        })
        .collect()
}

#[test]
fn fingerprints_are_stable_per_seed() {
    for seed in [0_u64, 1, 42, 0xDEAD_BEEF] {
        let first = generate_city(&small_config(seed)).expect("generation must succeed");
        let second = generate_city(&small_config(seed)).expect("generation must succeed");
        assert_eq!(
            first.map.fingerprint(),
            second.map.fingerprint(),
            "seed {seed} must reproduce its city"
        );
    }
}

#[test]
fn fingerprints_differ_across_seeds() {
    let mut fingerprints = HashSet::new();
    for seed in 0_u64..8 {
        let city = generate_city(&small_config(seed)).expect("generation must succeed");
        fingerprints.insert(city.map.fingerprint());
    }
    assert_eq!(fingerprints.len(), 8, "eight seeds must give eight distinct cities");
}

#[test]
fn every_item_is_reachable_from_the_player_spawn() {
    for seed in [3_u64, 17, 256, 99_999] {
        let city = generate_city(&small_config(seed)).expect("generation must succeed");
        assert!(!city.map.item_spawns.is_empty(), "seed {seed} placed no items");
        let stranded = unreachable_items(&city);
        assert!(stranded.is_empty(), "seed {seed}: unreachable items at {stranded:?}");
    }
}

#[test]
fn player_spawn_sits_on_a_road_cell() {
    for seed in [0_u64, 5, 1_000] {
        let city = generate_city(&small_config(seed)).expect("generation must succeed");
        assert_eq!(city.map.cell_at(city.map.player_spawn), Some(CellKind::Road));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn any_seed_generates_a_walkable_city(seed in any::<u64>()) {
        let city = generate_city(&small_config(seed)).expect("generation must succeed");
        prop_assert!(!city.map.buildings.is_empty());
        prop_assert!(city.map.cells.contains(&CellKind::Road));
        let stranded = unreachable_items(&city);
        prop_assert!(stranded.is_empty(), "unreachable items at {:?}", stranded);
    }

    #[test]
    fn door_graphs_stay_connected_for_any_seed(seed in any::<u64>()) {
        let city = generate_city(&small_config(seed)).expect("generation must succeed");
        for (_, building) in &city.map.buildings {
            // BFS over the door graph from room 0.
            let mut visited = vec![false; building.rooms.len()];
            let mut queue = vec![0_usize];
            visited[0] = true;
            while let Some(current) = queue.pop() {
                for &next in &building.rooms[current].connected2 {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push(next);
                    }
                }
            }
            prop_assert!(
                visited.iter().all(|&seen| seen),
                "isolated room in {:?}",
                building.bounds
            );
        }
    }
}
