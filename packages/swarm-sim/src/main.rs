//! main.rs — Phantom UAV experiment entry point
//!
//! Loads an experiment config (TOML), runs the simulation + detectors once or
//! as a parameter sweep, prints a metrics table and writes JSON results.

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use swarm_sim::config::ExperimentConfig;
use swarm_sim::runner::ExperimentRunner;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "swarm-sim", about = "UAV Remote ID phantom attack simulator")]
struct Args {
    /// Config file path (built-in defaults if missing)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Output directory (overrides experiment.output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Root seed (overrides experiment.seed)
    #[arg(long)]
    seed: Option<u64>,
    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
    /// Parameter to sweep: phantom_count, comm_range_m, num_uavs, contamination
    #[arg(long, requires = "sweep_values")]
    sweep_param: Option<String>,
    /// Comma-separated sweep values
    #[arg(long, value_delimiter = ',', requires = "sweep_param")]
    sweep_values: Vec<f64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.quiet { "swarm_sim=warn" } else { "swarm_sim=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config_str = match std::fs::read_to_string(&args.config) {
        Ok(s) => s,
        Err(_) => {
            info!("No config at {}, using built-in defaults", args.config.display());
            include_str!("../config.toml").to_string()
        }
    };
    let mut cfg: ExperimentConfig = toml::from_str(&config_str)
        .with_context(|| format!("invalid config {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        cfg.experiment.seed = seed;
    }
    if let Some(dir) = args.output {
        cfg.experiment.output_dir = dir;
    }

    info!(
        "🛩  {} | {} UAVs | range={}m | seed={}",
        cfg.experiment.name, cfg.swarm.num_uavs, cfg.swarm.comm_range_m, cfg.experiment.seed
    );

    let output_dir = cfg.experiment.output_dir.clone();
    let runner = ExperimentRunner::new(cfg.clone()).context("invalid experiment configuration")?;

    match args.sweep_param {
        Some(param) => {
            let runs = runner.run_parameter_sweep(&param, &args.sweep_values)?;
            for (value, results) in &runs {
                println!("{param} = {value}");
                print!("{}", report::format_table(results));
            }
            report::write_sweep(&output_dir, &cfg, &param, &runs)?;
        }
        None => {
            let results = runner.run()?;
            print!("{}", report::format_table(&results));
            report::write_run(&output_dir, &cfg, &results)?;
        }
    }
    Ok(())
}
