use std::{fmt, mem};

use glam::Vec3;
use serde::Serialize;

use super::Aabb;
use crate::error::BvhError;

/// Subsets with at most this many indices become a leaf.
pub const LEAF_SIZE: usize = 5;

/// A node of the hierarchy. Leaves store point indices, internal nodes store the
/// exact bounds of every point below them and exclusively own both children.
///
/// `Clone`, `PartialEq` and `Debug` are written by hand with explicit stacks, so
/// they work on chain-shaped trees of any depth.
pub enum BvhNode {
    Leaf {
        indices: Vec<usize>,
    },
    Internal {
        bounds: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BvhStats {
    pub node_count: usize,
    pub internal_count: usize,
    pub leaf_count: usize,
    /// Depth of the deepest leaf. A lone root leaf has depth 0.
    pub max_depth: usize,
    pub max_leaf_size: usize,
    pub index_count: usize,
}

impl BvhNode {
    pub fn leaf(indices: Vec<usize>) -> Self {
        BvhNode::Leaf { indices }
    }

    pub fn internal(bounds: Aabb, left: BvhNode, right: BvhNode) -> Self {
        BvhNode::Internal {
            bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn empty() -> Self {
        BvhNode::Leaf {
            indices: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }

    /// True for a leaf without indices, i.e. a tree built from no points or one that was cleared.
    pub fn is_empty(&self) -> bool {
        matches!(self, BvhNode::Leaf { indices } if indices.is_empty())
    }

    pub fn indices(&self) -> Option<&[usize]> {
        match self {
            BvhNode::Leaf { indices } => Some(indices),
            BvhNode::Internal { .. } => None,
        }
    }

    pub fn bounds(&self) -> Option<&Aabb> {
        match self {
            BvhNode::Leaf { .. } => None,
            BvhNode::Internal { bounds, .. } => Some(bounds),
        }
    }

    pub fn children(&self) -> Option<(&BvhNode, &BvhNode)> {
        match self {
            BvhNode::Leaf { .. } => None,
            BvhNode::Internal { left, right, .. } => Some((left, right)),
        }
    }

    /// Collects every index whose point lies inside `region`, skipping `exclude`.
    ///
    /// Results come in left-to-right, depth-first leaf order. Fails with
    /// [`BvhError::IndexOutOfRange`] as soon as a visited index does not address
    /// `positions`.
    pub fn query(
        &self,
        positions: &[Vec3],
        region: &Aabb,
        exclude: usize,
    ) -> Result<Vec<usize>, BvhError> {
        let mut result = Vec::new();
        self.query_into(positions, region, exclude, &mut result)?;
        Ok(result)
    }

    /// Same as [`BvhNode::query`] but appends to `result`. On error, `result` may
    /// already hold the matches found before the failing index.
    pub fn query_into(
        &self,
        positions: &[Vec3],
        region: &Aabb,
        exclude: usize,
        result: &mut Vec<usize>,
    ) -> Result<(), BvhError> {
        self.collect_into(
            positions,
            exclude,
            result,
            |bounds| bounds.intersects(region),
            |point| region.contains_point(point),
        )
    }

    /// Collects every index whose point is within `radius` of `center` (inclusive),
    /// skipping `exclude`. Same order and error behaviour as [`BvhNode::query`].
    ///
    /// A negative or NaN radius matches nothing.
    pub fn query_sphere(
        &self,
        positions: &[Vec3],
        center: Vec3,
        radius: f32,
        exclude: usize,
    ) -> Result<Vec<usize>, BvhError> {
        let mut result = Vec::new();
        self.query_sphere_into(positions, center, radius, exclude, &mut result)?;
        Ok(result)
    }

    pub fn query_sphere_into(
        &self,
        positions: &[Vec3],
        center: Vec3,
        radius: f32,
        exclude: usize,
        result: &mut Vec<usize>,
    ) -> Result<(), BvhError> {
        if radius.is_nan() || radius < 0.0 {
            return Ok(());
        }
        let radius_sq = radius * radius;
        self.collect_into(
            positions,
            exclude,
            result,
            |bounds| bounds.intersects_sphere(center, radius),
            |point| center.distance_squared(point) <= radius_sq,
        )
    }

    // Depth-first, left before right. `visit` prunes internal nodes, `accept` filters leaf points.
    fn collect_into<V, A>(
        &self,
        positions: &[Vec3],
        exclude: usize,
        result: &mut Vec<usize>,
        visit: V,
        accept: A,
    ) -> Result<(), BvhError>
    where
        V: Fn(&Aabb) -> bool,
        A: Fn(Vec3) -> bool,
    {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                BvhNode::Leaf { indices } => {
                    for &index in indices {
                        if index == exclude {
                            continue;
                        }
                        let point = positions.get(index).ok_or(BvhError::IndexOutOfRange {
                            index,
                            len: positions.len(),
                        })?;
                        if accept(*point) {
                            result.push(index);
                        }
                    }
                }
                BvhNode::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    // Prune
                    if !visit(bounds) {
                        continue;
                    }
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        Ok(())
    }

    /// Tears the subtree down top-down, leaving `self` as an empty leaf.
    ///
    /// Uses an explicit stack, so chain-shaped trees from coincident points
    /// cannot overflow the call stack. Calling it on a cleared node is a no-op.
    pub fn clear(&mut self) {
        let mut stack = vec![mem::replace(self, BvhNode::empty())];
        while let Some(mut node) = stack.pop() {
            if let BvhNode::Internal { left, right, .. } = &mut node {
                stack.push(mem::replace(right.as_mut(), BvhNode::empty()));
                stack.push(mem::replace(left.as_mut(), BvhNode::empty()));
            }
        }
    }

    /// Calls `f` with the indices of every leaf in left-to-right order.
    pub fn for_each_leaf<F>(&self, mut f: F)
    where
        F: FnMut(&[usize]),
    {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                BvhNode::Leaf { indices } => f(indices),
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            stats.node_count += 1;
            match node {
                BvhNode::Leaf { indices } => {
                    stats.leaf_count += 1;
                    stats.index_count += indices.len();
                    stats.max_leaf_size = stats.max_leaf_size.max(indices.len());
                    stats.max_depth = stats.max_depth.max(depth);
                }
                BvhNode::Internal { left, right, .. } => {
                    stats.internal_count += 1;
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        stats
    }
}

impl Clone for BvhNode {
    fn clone(&self) -> Self {
        let mut root = BvhNode::empty();
        // Source node paired with the placeholder it is copied into
        let mut stack: Vec<(&BvhNode, &mut BvhNode)> = vec![(self, &mut root)];
        while let Some((source, target)) = stack.pop() {
            match source {
                BvhNode::Leaf { indices } => *target = BvhNode::leaf(indices.clone()),
                BvhNode::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    *target = BvhNode::internal(*bounds, BvhNode::empty(), BvhNode::empty());
                    if let BvhNode::Internal {
                        left: target_left,
                        right: target_right,
                        ..
                    } = target
                    {
                        stack.push((right.as_ref(), target_right.as_mut()));
                        stack.push((left.as_ref(), target_left.as_mut()));
                    }
                }
            }
        }
        root
    }
}

impl PartialEq for BvhNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some(pair) = stack.pop() {
            match pair {
                (BvhNode::Leaf { indices: a }, BvhNode::Leaf { indices: b }) => {
                    if a != b {
                        return false;
                    }
                }
                (
                    BvhNode::Internal {
                        bounds: bounds_a,
                        left: left_a,
                        right: right_a,
                    },
                    BvhNode::Internal {
                        bounds: bounds_b,
                        left: left_b,
                        right: right_b,
                    },
                ) => {
                    if bounds_a != bounds_b {
                        return false;
                    }
                    stack.push((right_a.as_ref(), right_b.as_ref()));
                    stack.push((left_a.as_ref(), left_b.as_ref()));
                }
                _ => return false,
            }
        }
        true
    }
}

/// Internal nodes print their bounds and a summary of the subtree, not the subtree itself.
impl fmt::Debug for BvhNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BvhNode::Leaf { indices } => f.debug_struct("Leaf").field("indices", indices).finish(),
            BvhNode::Internal { bounds, .. } => {
                let stats = self.stats();
                f.debug_struct("Internal")
                    .field("bounds", bounds)
                    .field("nodes", &stats.node_count)
                    .field("points", &stats.index_count)
                    .field("max_depth", &stats.max_depth)
                    .finish_non_exhaustive()
            }
        }
    }
}

impl Drop for BvhNode {
    fn drop(&mut self) {
        // Children that are leaves drop shallowly. Anything deeper is unlinked
        // iteratively instead of through nested drop calls.
        let shallow = match self {
            BvhNode::Leaf { .. } => true,
            BvhNode::Internal { left, right, .. } => left.is_leaf() && right.is_leaf(),
        };
        if !shallow {
            self.clear();
        }
    }
}
