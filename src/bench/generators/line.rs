use glam::Vec3;

use super::PointGenerator;

/// Evenly spaced points along the x axis. Every split lands on x.
pub struct LineGenerator {
    extent: f32,
}

impl LineGenerator {
    pub fn new(extent: f32) -> LineGenerator {
        Self { extent }
    }
}

impl PointGenerator for LineGenerator {
    fn generate(&self, count: usize) -> Vec<Vec3> {
        if count < 2 {
            return vec![Vec3::ZERO; count];
        }
        let step = 2.0 * self.extent / (count - 1) as f32;
        (0..count)
            .map(|i| Vec3::new((-self.extent + i as f32 * step).min(self.extent), 0.0, 0.0))
            .collect()
    }
}
