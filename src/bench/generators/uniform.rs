use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::PointGenerator;

pub struct UniformGenerator {
    extent: f32,
    seed: u64,
}

impl UniformGenerator {
    pub fn new(extent: f32, seed: u64) -> UniformGenerator {
        debug_assert!(extent > 0.0, "Extent needs to be > 0");
        Self { extent, seed }
    }
}

impl PointGenerator for UniformGenerator {
    fn generate(&self, count: usize) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let e = self.extent;
        (0..count)
            .map(|_| Vec3::new(rng.gen_range(-e..=e), rng.gen_range(-e..=e), rng.gen_range(-e..=e)))
            .collect()
    }
}
