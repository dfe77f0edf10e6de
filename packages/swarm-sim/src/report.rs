//! report.rs — Writes experiment outputs to disk
//!
//! Per run directory:
//!   metrics.json  per-detector metrics, step trace, broadcast counts
//!   config.toml   the exact configuration that produced them

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use swarm_sim::config::ExperimentConfig;
use swarm_sim::runner::ExperimentResults;

#[derive(Serialize)]
struct SweepEntry<'a> {
    value: f64,
    results: &'a ExperimentResults,
}

#[derive(Serialize)]
struct SweepReport<'a> {
    parameter: &'a str,
    runs: Vec<SweepEntry<'a>>,
}

pub fn write_run(dir: &Path, config: &ExperimentConfig, results: &ExperimentResults) -> Result<PathBuf> {
    let out = dir.join(&results.experiment_name);
    fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;
    write_json(&out.join("metrics.json"), results)?;
    let echo = toml::to_string_pretty(config).context("serializing config echo")?;
    fs::write(out.join("config.toml"), echo).with_context(|| format!("writing config to {}", out.display()))?;
    info!("💾 Results written to {}", out.display());
    Ok(out)
}

pub fn write_sweep(
    dir: &Path,
    config: &ExperimentConfig,
    param: &str,
    runs: &[(f64, ExperimentResults)],
) -> Result<PathBuf> {
    let out = dir.join(format!("{}_sweep_{param}", config.experiment.name));
    fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;
    let report = SweepReport {
        parameter: param,
        runs: runs.iter().map(|(value, results)| SweepEntry { value: *value, results }).collect(),
    };
    write_json(&out.join("sweep.json"), &report)?;
    let echo = toml::to_string_pretty(config).context("serializing config echo")?;
    fs::write(out.join("config.toml"), echo)?;
    info!("💾 Sweep of {} runs written to {}", runs.len(), out.display());
    Ok(out)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing results")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Plain-text metrics table for stdout.
pub fn format_table(results: &ExperimentResults) -> String {
    let mut s = format!(
        "{}  ({} steps, {} training graphs, {:.2}s)\n",
        results.experiment_name,
        results.steps.len(),
        results.training_graphs,
        results.execution_time.as_secs_f64()
    );
    s.push_str(&format!(
        "{:<16}{:>8}{:>8}{:>11}{:>8}{:>13}\n",
        "detector", "TPR", "FPR", "precision", "F1", "latency(ms)"
    ));
    for (name, m) in &results.detection_metrics {
        s.push_str(&format!(
            "{:<16}{:>8.3}{:>8.3}{:>11.3}{:>8.3}{:>13.2}\n",
            name,
            m.tpr,
            m.fpr,
            m.precision,
            m.f1,
            m.detection_time * 1e3
        ));
    }
    s
}
