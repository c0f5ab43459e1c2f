use std::{error::Error, time::Instant};

use glam::Vec3;
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    bvh::{Aabb, Bvh},
    log_err,
};

pub mod config;
pub mod generators;
pub mod stats;

pub use config::BenchmarkConfig;
pub use generators::{PointDistribution, PointGenerator};
pub use stats::BenchmarkStats;

/// Reference answer for a region query: scans every point.
pub fn brute_force_query(positions: &[Vec3], region: &Aabb, exclude: usize) -> Vec<usize> {
    positions
        .iter()
        .enumerate()
        .filter(|(i, p)| *i != exclude && region.contains_point(**p))
        .map(|(i, _)| i)
        .collect()
}

/// Reference answer for a sphere query: scans every point.
pub fn brute_force_query_sphere(
    positions: &[Vec3],
    center: Vec3,
    radius: f32,
    exclude: usize,
) -> Vec<usize> {
    positions
        .iter()
        .enumerate()
        .filter(|(i, p)| {
            *i != exclude && radius >= 0.0 && center.distance_squared(**p) <= radius * radius
        })
        .map(|(i, _)| i)
        .collect()
}

/// Runs the whole benchmark suite, one entry per configured point count.
pub fn run_benchmark(config: &BenchmarkConfig) -> Result<Vec<BenchmarkStats>, Box<dyn Error>> {
    info!(
        "Running {} benchmark for point counts {:?}",
        config.distribution.name(),
        config.point_counts
    );
    let generator = config.distribution.generator(config.extent, config.seed);
    let mut results = Vec::with_capacity(config.point_counts.len());
    for &count in &config.point_counts {
        let positions = generator.generate(count);
        let stats = run_point_set(config, &positions)?;
        stats.print_stats();
        if let Some(path) = config.csv_path.as_ref() {
            log_err!(stats.save_csv(path), "Could not save stats to {path}: {err}");
        }
        results.push(stats);
    }
    Ok(results)
}

/// Builds one tree over `positions` and runs the configured neighbourhood queries against it.
pub fn run_point_set(
    config: &BenchmarkConfig,
    positions: &[Vec3],
) -> Result<BenchmarkStats, Box<dyn Error>> {
    let start_build = Instant::now();
    let tree = Bvh::build(positions);
    let build_ms = start_build.elapsed().as_secs_f32() * 1000.0;

    let build_parallel_ms = if config.parallel {
        let start_build = Instant::now();
        let parallel = Bvh::build_parallel(positions);
        let elapsed = start_build.elapsed().as_secs_f32() * 1000.0;
        if parallel.root() != tree.root() {
            return Err(format!(
                "Parallel build differs from sequential build for {} points",
                positions.len()
            )
            .into());
        }
        Some(elapsed)
    } else {
        None
    };

    // Flocking style: every query is centred on a point and excludes that point
    let query_count = if positions.is_empty() {
        0
    } else {
        config.query_count
    };
    let mut rng = StdRng::seed_from_u64(config.seed);
    let centers: Vec<usize> = (0..query_count)
        .map(|_| rng.gen_range(0..positions.len()))
        .collect();

    let mut buffer = Vec::new();
    let mut total_hits = 0;
    let mut query_total_ms = 0.0;
    for &center in &centers {
        let region = Aabb::from_center_half_extents(positions[center], config.query_half_extent);
        buffer.clear();
        let start_query = Instant::now();
        match config.sphere_radius {
            Some(radius) => {
                tree.query_sphere_into(positions, positions[center], radius, center, &mut buffer)?
            }
            None => tree.query_into(positions, &region, center, &mut buffer)?,
        }
        query_total_ms += start_query.elapsed().as_secs_f32() * 1000.0;
        total_hits += buffer.len();

        if config.verify {
            let mut expected = match config.sphere_radius {
                Some(radius) => brute_force_query_sphere(positions, positions[center], radius, center),
                None => brute_force_query(positions, &region, center),
            };
            buffer.sort_unstable();
            expected.sort_unstable();
            if buffer != expected {
                return Err(format!(
                    "Query around index {center} returned {} hits, brute force found {}",
                    buffer.len(),
                    expected.len()
                )
                .into());
            }
        }
    }
    debug!(
        "{} queries over {} points verified: {}",
        query_count,
        positions.len(),
        config.verify
    );

    Ok(BenchmarkStats {
        distribution: config.distribution.name().to_string(),
        point_count: positions.len(),
        build_ms,
        build_parallel_ms,
        query_count,
        query_total_ms,
        total_hits,
        tree: tree.stats(),
    })
}
