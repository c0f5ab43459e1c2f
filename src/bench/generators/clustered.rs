use glam::Vec3;
use log::warn;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::PointGenerator;

// Candidates per requested point before we give up on the noise band
const MAX_ATTEMPTS_PER_POINT: usize = 64;

/// Rejection samples uniform candidates against a 3D Perlin field, so points
/// gather in blobs with empty space in between, a bit like flocks.
pub struct ClusteredGenerator {
    extent: f32,
    seed: u64,
    perlin: Perlin,
    scale: f64,
    threshold: f64,
}

impl ClusteredGenerator {
    pub fn new(extent: f32, seed: u64) -> ClusteredGenerator {
        debug_assert!(extent > 0.0, "Extent needs to be > 0");
        Self {
            extent,
            seed,
            perlin: Perlin::new(perlin_seed(seed)),
            // TUNING
            scale: 4.0 / extent as f64,
            threshold: 0.2,
        }
    }
}

// Perlin only takes a u32 seed. Both halves of the u64 are folded in.
fn perlin_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

impl PointGenerator for ClusteredGenerator {
    fn generate(&self, count: usize) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let e = self.extent;
        let mut points = Vec::with_capacity(count);
        let mut attempts = 0;
        while points.len() < count && attempts < count * MAX_ATTEMPTS_PER_POINT {
            attempts += 1;
            let candidate = Vec3::new(
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
                rng.gen_range(-e..=e),
            );
            // [-1; 1]
            let noise_val = self.perlin.get([
                candidate.x as f64 * self.scale,
                candidate.y as f64 * self.scale,
                candidate.z as f64 * self.scale,
            ]);
            if noise_val > self.threshold {
                points.push(candidate);
            }
        }
        if points.len() < count {
            warn!(
                "Noise band too sparse: only {} of {count} clustered points, filling up uniformly",
                points.len()
            );
            while points.len() < count {
                points.push(Vec3::new(
                    rng.gen_range(-e..=e),
                    rng.gen_range(-e..=e),
                    rng.gen_range(-e..=e),
                ));
            }
        }
        points
    }
}
