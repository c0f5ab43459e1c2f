mod axis;
mod bbs;
mod build;
mod iter_region;
mod node;
mod tree;

pub use axis::Axis;
pub use bbs::Aabb;
pub use build::PARALLEL_SPLIT_THRESHOLD;
pub use iter_region::BvhRegionIterator;
pub use node::BvhNode;
pub use node::BvhStats;
pub use node::LEAF_SIZE;
pub use tree::Bvh;
