use std::{error::Error, fs, path::Path};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::generators::PointDistribution;

/// Settings for one benchmark run. Every field is optional in the JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub point_counts: Vec<usize>,
    pub query_count: usize,
    /// Half size of the neighbourhood box centred on each queried point
    pub query_half_extent: Vec3,
    /// Query spheres of this radius instead of boxes
    pub sphere_radius: Option<f32>,
    pub distribution: PointDistribution,
    /// Points are generated inside `[-extent, extent]^3`
    pub extent: f32,
    pub seed: u64,
    /// Also time the rayon build and check it produces the same tree
    pub parallel: bool,
    /// Compare every query against a brute force scan
    pub verify: bool,
    pub csv_path: Option<String>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            point_counts: vec![1_000, 10_000, 100_000],
            query_count: 1_000,
            query_half_extent: Vec3::splat(2.0),
            sphere_radius: None,
            distribution: PointDistribution::Uniform,
            extent: 100.0,
            seed: 99,
            parallel: true,
            verify: false,
            csv_path: None,
        }
    }
}

impl BenchmarkConfig {
    pub fn from_json_str(json: &str) -> Result<BenchmarkConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<BenchmarkConfig, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&contents)?)
    }

    /// Builds the config from command line arguments (without the program name).
    ///
    /// `--config <path>` is read first; all other flags override its values.
    pub fn from_args(args: &[String]) -> Result<BenchmarkConfig, Box<dyn Error>> {
        let mut config = match flag_value(args, "--config")? {
            Some(path) => Self::from_json_file(path)?,
            None => BenchmarkConfig::default(),
        };

        if let Some(counts) = flag_value(args, "--points")? {
            config.point_counts = counts
                .split(',')
                .map(|c| c.trim().parse::<usize>())
                .collect::<Result<Vec<usize>, _>>()?;
        }
        if let Some(queries) = flag_value(args, "--queries")? {
            config.query_count = queries.parse()?;
        }
        if let Some(seed) = flag_value(args, "--seed")? {
            config.seed = seed.parse()?;
        }
        if let Some(half) = flag_value(args, "--radius")? {
            config.query_half_extent = Vec3::splat(half.parse()?);
        }
        if let Some(radius) = flag_value(args, "--sphere")? {
            config.sphere_radius = Some(radius.parse()?);
        }
        if let Some(name) = flag_value(args, "--distribution")? {
            config.distribution = PointDistribution::from_name(name)
                .ok_or_else(|| format!("Unknown point distribution '{name}'"))?;
        }
        if let Some(path) = flag_value(args, "--csv")? {
            config.csv_path = Some(path.to_string());
        }
        if args.contains(&"--parallel".to_string()) {
            config.parallel = true;
        }
        if args.contains(&"--sequential".to_string()) {
            config.parallel = false;
        }
        if args.contains(&"--verify".to_string()) || args.contains(&"-v".to_string()) {
            config.verify = true;
        }
        Ok(config)
    }
}

// Value following `flag`, if the flag is present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>, String> {
    match args.iter().position(|arg| arg == flag) {
        None => Ok(None),
        Some(pos) => args
            .get(pos + 1)
            .map(|value| Some(value.as_str()))
            .ok_or_else(|| format!("Missing value for {flag}")),
    }
}
