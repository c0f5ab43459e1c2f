use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod clustered;
pub mod coincident;
pub mod line;
pub mod uniform;

pub trait PointGenerator: Sync + Send {
    /// Generates `count` points inside the cube `[-extent, extent]^3`
    fn generate(&self, count: usize) -> Vec<Vec3>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointDistribution {
    Uniform,
    Line,
    Clustered,
    Coincident,
}

impl PointDistribution {
    pub fn generator(self, extent: f32, seed: u64) -> Box<dyn PointGenerator> {
        match self {
            PointDistribution::Uniform => Box::new(uniform::UniformGenerator::new(extent, seed)),
            PointDistribution::Line => Box::new(line::LineGenerator::new(extent)),
            PointDistribution::Clustered => {
                Box::new(clustered::ClusteredGenerator::new(extent, seed))
            }
            PointDistribution::Coincident => Box::new(coincident::CoincidentGenerator::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PointDistribution::Uniform => "uniform",
            PointDistribution::Line => "line",
            PointDistribution::Clustered => "clustered",
            PointDistribution::Coincident => "coincident",
        }
    }

    pub fn from_name(name: &str) -> Option<PointDistribution> {
        match name {
            "uniform" => Some(PointDistribution::Uniform),
            "line" => Some(PointDistribution::Line),
            "clustered" => Some(PointDistribution::Clustered),
            "coincident" => Some(PointDistribution::Coincident),
            _ => None,
        }
    }
}
