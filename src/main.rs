use std::{env, process};

use log::{error, info};
use rs_pointbvh::bench::{BenchmarkConfig, run_benchmark};

const USAGE: &str = "Usage: pointbvh [--config <file.json>] [--points 1000,10000] [--queries N] \
[--radius R] [--sphere R] [--distribution uniform|line|clustered|coincident] [--seed N] \
[--csv <path>] [--parallel|--sequential] [--verify|-v]";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        println!("{USAGE}");
        return;
    }

    let config = match BenchmarkConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid arguments: {err}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    match run_benchmark(&config) {
        Ok(results) => info!("Benchmark finished: {} point sets", results.len()),
        Err(err) => {
            error!("Benchmark failed: {err}");
            process::exit(1);
        }
    }
}
