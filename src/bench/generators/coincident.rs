use glam::Vec3;

use super::PointGenerator;

/// Every point at the origin, like a flock right after spawning.
#[derive(Default)]
pub struct CoincidentGenerator;

impl CoincidentGenerator {
    pub fn new() -> CoincidentGenerator {
        CoincidentGenerator
    }
}

impl PointGenerator for CoincidentGenerator {
    fn generate(&self, count: usize) -> Vec<Vec3> {
        vec![Vec3::ZERO; count]
    }
}
