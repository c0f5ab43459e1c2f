use std::{
    fs::{File, OpenOptions, create_dir_all},
    io::{BufWriter, Write},
    path::Path,
};

use log::info;
use serde::Serialize;

use crate::bvh::BvhStats;

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkStats {
    pub distribution: String,
    pub point_count: usize,
    pub build_ms: f32,
    /// `None` when the parallel build was skipped
    pub build_parallel_ms: Option<f32>,
    pub query_count: usize,
    pub query_total_ms: f32,
    pub total_hits: usize,
    pub tree: BvhStats,
}

impl BenchmarkStats {
    pub fn avg_query_us(&self) -> f32 {
        if self.query_count == 0 {
            return 0.0;
        }
        self.query_total_ms * 1000.0 / self.query_count as f32
    }

    pub fn avg_hits(&self) -> f32 {
        if self.query_count == 0 {
            return 0.0;
        }
        self.total_hits as f32 / self.query_count as f32
    }

    pub fn print_stats(&self) {
        info!(
            "{} x {}: build {:.3}ms (parallel {}), {} nodes, depth {}, {} queries avg {:.2} micro-s, avg hits {:.2}",
            self.distribution,
            self.point_count,
            self.build_ms,
            self.build_parallel_ms
                .map(|ms| format!("{ms:.3}ms"))
                .unwrap_or_else(|| "skipped".to_string()),
            self.tree.node_count,
            self.tree.max_depth,
            self.query_count,
            self.avg_query_us(),
            self.avg_hits(),
        )
    }

    /// Creates the CSV file with its header row on first use
    fn init_csv(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            return Ok(());
        }
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        let mut file = File::create(path)?;
        writeln!(
            file,
            "Distribution,PointCount,BuildMs,BuildParallelMs,Nodes,MaxDepth,QueryCount,AvgQueryUs,AvgHits"
        )
    }

    /// Appends these stats as one row to the CSV file at `path`
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        Self::init_csv(path)?;

        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "{},{},{:.3},{},{},{},{},{:.3},{:.2}",
            self.distribution,
            self.point_count,
            self.build_ms,
            self.build_parallel_ms
                .map(|ms| format!("{ms:.3}"))
                .unwrap_or_default(),
            self.tree.node_count,
            self.tree.max_depth,
            self.query_count,
            self.avg_query_us(),
            self.avg_hits(),
        )?;

        Ok(())
    }
}
