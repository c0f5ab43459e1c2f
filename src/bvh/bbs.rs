use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Axis;

/// Axis-aligned bounding box described by its min and max corners.
///
/// Both [`Aabb::contains_point`] and [`Aabb::intersects`] treat the boundary as
/// inside. A box built from a single point has zero size and still contains
/// that point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Aabb {
        debug_assert!(max.x >= min.x, "Invalid bounds: x axis");
        debug_assert!(max.y >= min.y, "Invalid bounds: y axis");
        debug_assert!(max.z >= min.z, "Invalid bounds: z axis");
        Self { min, max }
    }

    pub fn from_point(point: Vec3) -> Aabb {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Aabb {
        debug_assert!(
            half_extents.cmpge(Vec3::ZERO).all(),
            "Half extents of BB need to be >= 0"
        );
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Grows the box so that it includes `point`.
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent_on_axis(&self, axis: Axis) -> f32 {
        axis.coord(self.max) - axis.coord(self.min)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        // For each axis, check if one box is completely to one side of the other
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// True if the sphere touches the box. Compares the squared distance from
    /// `center` to the closest point of the box, so touching counts.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        center.distance_squared(closest) <= radius * radius
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.x <= point.x
            && self.min.y <= point.y
            && self.min.z <= point.z
            && self.max.x >= point.x
            && self.max.y >= point.y
            && self.max.z >= point.z
    }
}
