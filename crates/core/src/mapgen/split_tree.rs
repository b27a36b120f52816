//! Binary space partitioning of an integer grid into leaf regions separated
//! by fixed-width corridors. City-scale trees use the road width as the
//! corridor; building interiors use a zero-width corridor so rooms tile the
//! footprint and walls live on cell edges.

use rand_chacha::ChaCha8Rng;

use crate::types::{GenError, GridRect};

use super::seed::{rand_chance, rand_range};

/// Parameters for one partitioning pass.
#[derive(Clone, Copy, Debug)]
pub struct SplitParams {
    pub min_leaf: i32,
    pub max_leaf: i32,
    pub corridor_width: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SplitAxis {
    /// Cut across the width: children sit side by side.
    AcrossWidth,
    /// Cut across the height: children stack vertically.
    AcrossHeight,
}

#[derive(Clone, Debug)]
struct SplitNode {
    bounds: GridRect,
    /// Corridor carved out when this node was split; `None` on leaves.
    corridor: Option<GridRect>,
}

/// The finished partition: an index-based node arena plus the leaves in
/// creation order. Children of a split node and its corridor rectangle
/// exactly tile the node's bounds.
#[derive(Clone, Debug)]
pub struct SplitTree {
    nodes: Vec<SplitNode>,
    leaves: Vec<usize>,
}

impl SplitTree {
    pub fn build(rng: &mut ChaCha8Rng, params: &SplitParams) -> Result<SplitTree, GenError> {
        if params.max_leaf < 2 * params.min_leaf + params.corridor_width {
            return Err(GenError::SplitParams {
                min_leaf: params.min_leaf,
                max_leaf: params.max_leaf,
                corridor_width: params.corridor_width,
            });
        }
        if params.width < 1 || params.height < 1 {
            return Err(GenError::EmptyLayout { width: params.width, height: params.height });
        }

        let root = GridRect { x: 0, y: 0, width: params.width, height: params.height };
        let mut tree = SplitTree {
            nodes: vec![SplitNode { bounds: root, corridor: None }],
            leaves: Vec::new(),
        };

        // Manual work stack instead of recursion; large city grids can nest deep.
        let mut to_check = vec![0_usize];
        while let Some(index) = to_check.pop() {
            let bounds = tree.nodes[index].bounds;
            match decide_split(rng, params, bounds) {
                Some(axis) => {
                    let (first, corridor, second) = cut(rng, params, bounds, axis);
                    let first_index = tree.push_node(first);
                    let second_index = tree.push_node(second);
                    tree.nodes[index].corridor = Some(corridor);
                    to_check.push(first_index);
                    to_check.push(second_index);
                }
                None => tree.leaves.push(index),
            }
        }

        Ok(tree)
    }

    fn push_node(&mut self, bounds: GridRect) -> usize {
        self.nodes.push(SplitNode { bounds, corridor: None });
        self.nodes.len() - 1
    }

    pub fn leaf_bounds(&self) -> Vec<GridRect> {
        self.leaves.iter().map(|&index| self.nodes[index].bounds).collect()
    }

    /// Corridor rectangles of every split node, in arena order.
    /// Zero-width corridors (building interiors) are omitted.
    pub fn corridor_bounds(&self) -> Vec<GridRect> {
        self.nodes
            .iter()
            .filter_map(|node| node.corridor)
            .filter(|corridor| corridor.width > 0 && corridor.height > 0)
            .collect()
    }

    pub fn root_bounds(&self) -> GridRect {
        self.nodes[0].bounds
    }
}

fn decide_split(rng: &mut ChaCha8Rng, params: &SplitParams, bounds: GridRect) -> Option<SplitAxis> {
    let splittable = 2 * params.min_leaf + params.corridor_width;
    let must_split = bounds.width > params.max_leaf || bounds.height > params.max_leaf;
    let can_split_width = bounds.width >= splittable;
    let can_split_height = bounds.height >= splittable;

    let wants_split = must_split || (can_split_width && can_split_height && rand_chance(rng, 3, 4));
    if !wants_split {
        return None;
    }

    // Aspect bias keeps leaves roughly square; a forced cut must still pick a
    // cuttable axis.
    let aspect = bounds.width as f32 / bounds.height as f32;
    let preferred = if aspect >= 1.25 {
        SplitAxis::AcrossWidth
    } else if aspect <= 0.75 {
        SplitAxis::AcrossHeight
    } else if rand_chance(rng, 1, 2) {
        SplitAxis::AcrossWidth
    } else {
        SplitAxis::AcrossHeight
    };

    match preferred {
        SplitAxis::AcrossWidth if can_split_width => Some(SplitAxis::AcrossWidth),
        SplitAxis::AcrossHeight if can_split_height => Some(SplitAxis::AcrossHeight),
        _ if can_split_width => Some(SplitAxis::AcrossWidth),
        _ if can_split_height => Some(SplitAxis::AcrossHeight),
        _ => None,
    }
}

fn cut(
    rng: &mut ChaCha8Rng,
    params: &SplitParams,
    bounds: GridRect,
    axis: SplitAxis,
) -> (GridRect, GridRect, GridRect) {
    match axis {
        SplitAxis::AcrossWidth => {
            let offset = rand_range(
                rng,
                params.min_leaf,
                bounds.width - params.min_leaf - params.corridor_width,
            );
            let first = GridRect { width: offset, ..bounds };
            let corridor = GridRect {
                x: bounds.x + offset,
                width: params.corridor_width,
                ..bounds
            };
            let second = GridRect {
                x: bounds.x + offset + params.corridor_width,
                width: bounds.width - offset - params.corridor_width,
                ..bounds
            };
            (first, corridor, second)
        }
        SplitAxis::AcrossHeight => {
            let offset = rand_range(
                rng,
                params.min_leaf,
                bounds.height - params.min_leaf - params.corridor_width,
            );
            let first = GridRect { height: offset, ..bounds };
            let corridor = GridRect {
                y: bounds.y + offset,
                height: params.corridor_width,
                ..bounds
            };
            let second = GridRect {
                y: bounds.y + offset + params.corridor_width,
                height: bounds.height - offset - params.corridor_width,
                ..bounds
            };
            (first, corridor, second)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::rand_core::SeedableRng;

    use super::*;

    fn assert_exact_tiling(tree: &SplitTree) {
        let root = tree.root_bounds();
        let mut pieces = tree.leaf_bounds();
        pieces.extend(tree.corridor_bounds());

        let piece_area: i32 = pieces.iter().map(|rect| rect.area()).sum();
        assert_eq!(piece_area, root.area(), "leaf + corridor area must equal root area");

        for left_index in 0..pieces.len() {
            for right_index in (left_index + 1)..pieces.len() {
                assert!(
                    !pieces[left_index].intersects(&pieces[right_index]),
                    "pieces must not overlap: {:?} vs {:?}",
                    pieces[left_index],
                    pieces[right_index]
                );
            }
        }
    }

    #[test]
    fn city_scale_partition_tiles_exactly_with_road_corridors() {
        for seed in [1_u64, 7, 42, 1_000, 987_654] {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let params = SplitParams {
                min_leaf: 12,
                max_leaf: 30,
                corridor_width: 3,
                width: 96,
                height: 96,
            };
            let tree = SplitTree::build(&mut rng, &params).expect("build must succeed");
            assert_exact_tiling(&tree);
        }
    }

    #[test]
    fn zero_width_corridor_partition_tiles_exactly() {
        for seed in [3_u64, 19, 555] {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let params =
                SplitParams { min_leaf: 3, max_leaf: 8, corridor_width: 0, width: 22, height: 17 };
            let tree = SplitTree::build(&mut rng, &params).expect("build must succeed");
            assert_exact_tiling(&tree);
            assert!(tree.corridor_bounds().is_empty());
        }
    }

    #[test]
    fn leaves_respect_size_bounds_on_large_grids() {
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let params =
            SplitParams { min_leaf: 4, max_leaf: 11, corridor_width: 1, width: 64, height: 64 };
        let tree = SplitTree::build(&mut rng, &params).expect("build must succeed");
        for leaf in tree.leaf_bounds() {
            assert!(leaf.width >= params.min_leaf && leaf.width <= params.max_leaf, "{leaf:?}");
            assert!(leaf.height >= params.min_leaf && leaf.height <= params.max_leaf, "{leaf:?}");
        }
    }

    #[test]
    fn unsatisfiable_leaf_bounds_fail_fast() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let params =
            SplitParams { min_leaf: 8, max_leaf: 10, corridor_width: 3, width: 50, height: 50 };
        let result = SplitTree::build(&mut rng, &params);
        assert!(matches!(result, Err(GenError::SplitParams { .. })));
    }

    #[test]
    fn tiny_grid_yields_single_leaf() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let params =
            SplitParams { min_leaf: 3, max_leaf: 8, corridor_width: 0, width: 4, height: 4 };
        let tree = SplitTree::build(&mut rng, &params).expect("build must succeed");
        assert_eq!(tree.leaf_bounds(), vec![tree.root_bounds()]);
    }

    #[test]
    fn identical_seeds_produce_identical_partitions() {
        let params =
            SplitParams { min_leaf: 5, max_leaf: 14, corridor_width: 2, width: 48, height: 40 };
        let mut rng_a = ChaCha8Rng::seed_from_u64(31_337);
        let mut rng_b = ChaCha8Rng::seed_from_u64(31_337);
        let tree_a = SplitTree::build(&mut rng_a, &params).expect("build must succeed");
        let tree_b = SplitTree::build(&mut rng_b, &params).expect("build must succeed");
        assert_eq!(tree_a.leaf_bounds(), tree_b.leaf_bounds());
        assert_eq!(tree_a.corridor_bounds(), tree_b.corridor_bounds());
    }
}
