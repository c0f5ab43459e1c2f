use std::mem;

use glam::Vec3;
use log::trace;

use super::{Aabb, Axis, BvhNode, LEAF_SIZE};

/// Below this many indices the parallel builder stops forking and recurses sequentially.
pub const PARALLEL_SPLIT_THRESHOLD: usize = 1024;

/// Outcome of partitioning one index range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Split {
    pub(super) bounds: Aabb,
    pub(super) axis: Axis,
    pub(super) value: f32,
    /// Indices before `mid` form the left child, the rest the right child.
    pub(super) mid: usize,
}

pub fn build(positions: &[Vec3]) -> BvhNode {
    let mut indices: Vec<usize> = (0..positions.len()).collect();
    let mut scratch = vec![0; positions.len()];
    build_recursive(positions, &mut indices, &mut scratch)
}

/// Builds the same tree as [`build`], forking large subtrees onto the rayon pool.
pub fn build_parallel(positions: &[Vec3]) -> BvhNode {
    let mut indices: Vec<usize> = (0..positions.len()).collect();
    let mut scratch = vec![0; positions.len()];
    build_recursive_parallel(positions, &mut indices, &mut scratch)
}

impl BvhNode {
    /// Builds a bare root over `positions`. [`super::Bvh::build`] additionally
    /// remembers the snapshot size to reject stale position slices.
    pub fn build(positions: &[Vec3]) -> BvhNode {
        build(positions)
    }

    pub fn build_parallel(positions: &[Vec3]) -> BvhNode {
        build_parallel(positions)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

// An internal node whose smaller child is already built while the larger one is still pending
struct SpineNode {
    bounds: Aabb,
    built: BvhNode,
    side: Side,
}

// Wraps `bottom` into the pending internal nodes, innermost first
fn assemble(mut spine: Vec<SpineNode>, bottom: BvhNode) -> BvhNode {
    let mut node = bottom;
    while let Some(SpineNode { bounds, built, side }) = spine.pop() {
        node = match side {
            Side::Left => BvhNode::internal(bounds, built, node),
            Side::Right => BvhNode::internal(bounds, node, built),
        };
    }
    node
}

// Recurses into the smaller half and loops on the larger one, which keeps the
// call depth logarithmic even for chains produced by coincident points.
fn build_recursive(
    positions: &[Vec3],
    mut indices: &mut [usize],
    mut scratch: &mut [usize],
) -> BvhNode {
    let mut spine = Vec::new();
    loop {
        // Exit condition
        if indices.len() <= LEAF_SIZE {
            return assemble(spine, BvhNode::leaf(indices.to_vec()));
        }

        let split = split_range(positions, indices, scratch);
        let (left_indices, right_indices) = mem::take(&mut indices).split_at_mut(split.mid);
        let (left_scratch, right_scratch) = mem::take(&mut scratch).split_at_mut(split.mid);
        if left_indices.len() <= right_indices.len() {
            let built = build_recursive(positions, left_indices, left_scratch);
            spine.push(SpineNode {
                bounds: split.bounds,
                built,
                side: Side::Left,
            });
            indices = right_indices;
            scratch = right_scratch;
        } else {
            let built = build_recursive(positions, right_indices, right_scratch);
            spine.push(SpineNode {
                bounds: split.bounds,
                built,
                side: Side::Right,
            });
            indices = left_indices;
            scratch = left_scratch;
        }
    }
}

fn build_recursive_parallel(
    positions: &[Vec3],
    mut indices: &mut [usize],
    mut scratch: &mut [usize],
) -> BvhNode {
    let mut spine = Vec::new();
    loop {
        if indices.len() < PARALLEL_SPLIT_THRESHOLD {
            let bottom = build_recursive(positions, indices, scratch);
            return assemble(spine, bottom);
        }

        let split = split_range(positions, indices, scratch);
        let (left_indices, right_indices) = mem::take(&mut indices).split_at_mut(split.mid);
        let (left_scratch, right_scratch) = mem::take(&mut scratch).split_at_mut(split.mid);

        // Only fork when both halves are worth a task of their own
        if left_indices.len().min(right_indices.len()) >= PARALLEL_SPLIT_THRESHOLD {
            let (left, right) = rayon::join(
                || build_recursive_parallel(positions, left_indices, left_scratch),
                || build_recursive_parallel(positions, right_indices, right_scratch),
            );
            return assemble(spine, BvhNode::internal(split.bounds, left, right));
        }

        if left_indices.len() <= right_indices.len() {
            let built = build_recursive(positions, left_indices, left_scratch);
            spine.push(SpineNode {
                bounds: split.bounds,
                built,
                side: Side::Left,
            });
            indices = right_indices;
            scratch = right_scratch;
        } else {
            let built = build_recursive(positions, right_indices, right_scratch);
            spine.push(SpineNode {
                bounds: split.bounds,
                built,
                side: Side::Right,
            });
            indices = left_indices;
            scratch = left_scratch;
        }
    }
}

/// Partitions `indices` in place around the mean of the widest axis.
///
/// The partition is stable: both halves keep the input order. `scratch` must be
/// at least as long as `indices`. Both halves are guaranteed to be non-empty.
pub(super) fn split_range(positions: &[Vec3], indices: &mut [usize], scratch: &mut [usize]) -> Split {
    debug_assert!(indices.len() > 1, "Cannot split fewer than two indices");
    debug_assert!(scratch.len() >= indices.len(), "Scratch buffer too small");

    let bounds = bounding_box(positions, indices);
    let axis = Axis::largest_extent(&bounds);
    let value = mean_on_axis(positions, indices, axis);

    // Left goes to the front of `indices`, right is staged in `scratch`.
    // The write cursor never overtakes the read cursor, so order is preserved.
    let mut left_len = 0;
    let mut right_len = 0;
    for i in 0..indices.len() {
        let index = indices[i];
        if axis.coord(positions[index]) < value {
            indices[left_len] = index;
            left_len += 1;
        } else {
            scratch[right_len] = index;
            right_len += 1;
        }
    }
    indices[left_len..].copy_from_slice(&scratch[..right_len]);

    // Degenerate partition: every coordinate on the axis landed on one side.
    // Move the first index into left, or the last index into right. The range
    // is still in input order, so moving only shifts `mid`.
    let mid = left_len.clamp(1, indices.len() - 1);
    let split = Split {
        bounds,
        axis,
        value,
        mid,
    };
    if mid != left_len {
        trace!(
            "Degenerate split of {} indices on {:?} at {}; forcing {mid}/{}",
            indices.len(),
            split.axis,
            split.value,
            indices.len() - mid
        );
    } else {
        trace!(
            "Split {} indices on {:?} at {} into {left_len}/{right_len}",
            indices.len(),
            split.axis,
            split.value
        );
    }
    split
}

/// Exact bounds of the referenced points. `indices` must not be empty.
pub(super) fn bounding_box(positions: &[Vec3], indices: &[usize]) -> Aabb {
    let mut bounds = Aabb::from_point(positions[indices[0]]);
    for &index in &indices[1..] {
        bounds.expand(positions[index]);
    }
    bounds
}

/// Arithmetic mean of the coordinates on `axis`, accumulated in input order.
pub(super) fn mean_on_axis(positions: &[Vec3], indices: &[usize], axis: Axis) -> f32 {
    let sum: f32 = indices.iter().map(|&i| axis.coord(positions[i])).sum();
    sum / indices.len() as f32
}
