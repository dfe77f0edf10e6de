//! runner.rs — Time-stepped experiment loop
//!
//! Each step, in order:
//!   1. advance the swarm by dt
//!   2. drive the phantom injector from the new clock
//!   3. collect Remote ID broadcasts (auth tags counted and handed to detectors)
//!   4. snapshot the communication graph
//!   5. until trained: bank clean snapshots; then score the snapshot with every detector
//!
//! Every run owns its swarm, RNG and detectors; sweeps never share state.
//! The swarm runs on `experiment.seed` itself; detector and key seeds are
//! forked from it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::attack::{InjectorState, PhantomInjector};
use crate::auth::oracle_for;
use crate::config::ExperimentConfig;
use crate::detection::{AnomalyDetector, DetectionResult};
use crate::error::Result;
use crate::graph::CommGraph;
use crate::metrics::{summarize, DetectorMetrics};
use crate::swarm::Swarm;

/// Per-step summary of the simulated world
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub time: f64,
    pub uavs: usize,
    pub links: usize,
    pub phantoms: usize,
    pub attack_state: Option<InjectorState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub sent: usize,
    pub authenticated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResults {
    pub experiment_name: String,
    pub steps: Vec<StepRecord>,
    pub training_graphs: usize,
    pub broadcasts: BroadcastStats,
    /// Detector name → one result per evaluated step
    #[serde(skip)]
    pub detections: BTreeMap<String, Vec<DetectionResult>>,
    pub detection_metrics: BTreeMap<String, DetectorMetrics>,
    pub execution_time: Duration,
}

pub struct ExperimentRunner {
    config: ExperimentConfig,
}

impl ExperimentRunner {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig { &self.config }

    pub fn run(&self) -> Result<ExperimentResults> {
        let started = Instant::now();
        let cfg = &self.config;
        let exp = &cfg.experiment;

        let mut forks = StdRng::seed_from_u64(exp.seed);
        let detector_seed: u64 = forks.gen();
        let key_seed: u64 = forks.gen();

        let mut swarm = Swarm::with_seed(&cfg.swarm, exp.seed)?;
        let oracle = if exp.enable_auth {
            let oracle = oracle_for(exp.auth_scheme, key_seed)?;
            info!("🔐 Broadcast signing enabled ({:?}, key {})", exp.auth_scheme, oracle.key_id());
            swarm = swarm.with_oracle(Arc::clone(&oracle));
            Some(oracle)
        } else {
            None
        };
        let mut injector = cfg.attack.as_ref().map(|a| PhantomInjector::new(a.build()?)).transpose()?;
        let mut detectors = cfg.detection.build_detectors(detector_seed, oracle)?;

        let n_steps = (exp.duration_s / exp.dt_s).round() as usize;
        let mut steps = Vec::with_capacity(n_steps);
        let mut clean: Vec<CommGraph> = Vec::new();
        let mut trained = false;
        let mut broadcasts = BroadcastStats::default();
        let mut detections: BTreeMap<String, Vec<DetectionResult>> =
            detectors.iter().map(|d| (d.name().to_string(), Vec::new())).collect();

        info!("🚀 {}: {} steps of {}s", exp.name, n_steps, exp.dt_s);

        for _ in 0..n_steps {
            swarm.advance(exp.dt_s)?;
            let t = swarm.simulation_time();
            let attack_state = match injector.as_mut() {
                Some(inj) => Some(inj.update(&mut swarm, t)?),
                None => None,
            };

            let messages = swarm.broadcast_all()?;
            broadcasts.sent += messages.len();
            if let Some(oracle) = swarm.oracle() {
                broadcasts.authenticated += messages.iter().filter(|m| oracle.verify(m)).count();
            }

            let graph = swarm.snapshot_graph();
            steps.push(StepRecord {
                time: t,
                uavs: graph.node_count(),
                links: graph.edge_count(),
                phantoms: swarm.uavs().filter(|u| !u.is_legitimate()).count(),
                attack_state,
            });

            if !trained {
                let attack_started = attack_state.is_some_and(|s| s != InjectorState::Inactive);
                if !attack_started && clean.len() < exp.training_window {
                    clean.push(graph);
                    continue;
                }
                train_all(&mut detectors, &clean);
                trained = true;
            }

            for d in detectors.iter_mut() {
                d.observe_broadcasts(&messages);
                let result = d.detect(&graph);
                detections.entry(d.name().to_string()).or_default().push(result);
            }
        }

        if !trained {
            warn!("{}: run ended before any detection step", exp.name);
        }

        let detection_metrics = detections.iter().map(|(name, rs)| (name.clone(), summarize(rs))).collect();
        Ok(ExperimentResults {
            experiment_name: exp.name.clone(),
            steps,
            training_graphs: clean.len(),
            broadcasts,
            detections,
            detection_metrics,
            execution_time: started.elapsed(),
        })
    }

    /// Re-run the experiment once per value of `param`.
    pub fn run_parameter_sweep(&self, param: &str, values: &[f64]) -> Result<Vec<(f64, ExperimentResults)>> {
        values
            .iter()
            .map(|&v| {
                let mut cfg = self.config.with_param(param, v)?;
                cfg.experiment.name = format!("{}_{param}_{v}", self.config.experiment.name);
                info!("🔄 Sweep {param}={v}");
                Ok((v, ExperimentRunner::new(cfg)?.run()?))
            })
            .collect()
    }
}

fn train_all(detectors: &mut [Box<dyn AnomalyDetector>], clean: &[CommGraph]) {
    info!("Training {} detector(s) on {} clean snapshots", detectors.len(), clean.len());
    for d in detectors.iter_mut() {
        d.train(clean);
        if !d.is_trained() {
            warn!("{} stayed untrained; its results will be empty", d.name());
        }
    }
}
