//! Bounding volume hierarchy over a caller owned slice of 3D points.
//!
//! Build a [`Bvh`] once per snapshot of positions, then ask it which points lie
//! inside a box while skipping one index (usually the point doing the asking).

pub mod bench;
pub mod bvh;
pub mod error;
mod util;

pub use bvh::{Aabb, Axis, Bvh, BvhNode, BvhRegionIterator, BvhStats, LEAF_SIZE};
pub use error::BvhError;
