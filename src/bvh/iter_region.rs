use std::slice;

use glam::Vec3;

use super::{Aabb, BvhNode};

/// Lazily walks the tree and yields the indices whose point lies in a region.
///
/// Yields the same indices in the same order as [`BvhNode::query`]. Only
/// handed out by [`super::Bvh::iter_region`], which checks the positions slice
/// against the tree before the walk starts.
pub struct BvhRegionIterator<'a> {
    stack: Vec<&'a BvhNode>,
    leaf: slice::Iter<'a, usize>,
    positions: &'a [Vec3],
    region: Aabb,
    exclude: usize,
}

impl<'a> BvhRegionIterator<'a> {
    pub(super) fn new(
        root: &'a BvhNode,
        positions: &'a [Vec3],
        region: Aabb,
        exclude: usize,
    ) -> BvhRegionIterator<'a> {
        BvhRegionIterator {
            stack: vec![root],
            leaf: Default::default(),
            positions,
            region,
            exclude,
        }
    }
}

impl Iterator for BvhRegionIterator<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Drain the current leaf first
            for &index in self.leaf.by_ref() {
                if index != self.exclude && self.region.contains_point(self.positions[index]) {
                    return Some(index);
                }
            }

            match self.stack.pop()? {
                BvhNode::Leaf { indices } => self.leaf = indices.iter(),
                BvhNode::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if bounds.intersects(&self.region) {
                        // Right first so that left is visited first
                        self.stack.push(right);
                        self.stack.push(left);
                    }
                }
            }
        }
    }
}
