use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Aabb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Axis along which `bounds` is widest. Ties go to the earlier axis (x, then y, then z).
    pub fn largest_extent(bounds: &Aabb) -> Axis {
        let x = bounds.extent_on_axis(Axis::X);
        let y = bounds.extent_on_axis(Axis::Y);
        let z = bounds.extent_on_axis(Axis::Z);
        if x >= y && x >= z {
            return Axis::X;
        }
        if y >= z {
            return Axis::Y;
        }
        Axis::Z
    }

    pub fn coord(self, point: Vec3) -> f32 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
            Axis::Z => point.z,
        }
    }
}
