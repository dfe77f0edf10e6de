//! config.rs — Experiment parameter sets
//!
//! Plain serde structs mirroring `config.toml`. File loading happens in the
//! binary; here values are validated and turned into core types. Every check
//! fails eagerly with `SimError::InvalidArgument`.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attack::{AttackScenario, AttackType, Placement};
use crate::auth::{AuthScheme, AuthenticationOracle};
use crate::detection::{
    AnomalyDetector, CryptoDetector, EmbeddingConfig, GraphEmbeddingDetector, GraphMetricConfig, GraphMetricDetector,
};
use crate::error::{ensure_at_least, ensure_positive, Result, SimError};
use crate::swarm::SwarmConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentSection,
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackConfig>,
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSection {
    pub name: String,
    pub seed: u64,
    /// Simulated time to run for (seconds)
    pub duration_s: f64,
    /// Step size (seconds)
    pub dt_s: f64,
    /// Clean snapshots collected before training, capped by the attack start
    pub training_window: usize,
    /// Sign broadcasts of legitimate UAVs
    pub enable_auth: bool,
    /// Signature scheme used when `enable_auth` is set
    pub auth_scheme: AuthScheme,
    pub output_dir: PathBuf,
}

impl Default for ExperimentSection {
    fn default() -> Self {
        Self {
            name: "phantom_attack".to_string(),
            seed: 42,
            duration_s: 60.0,
            dt_s: 1.0,
            training_window: 10,
            enable_auth: false,
            auth_scheme: AuthScheme::default(),
            output_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackConfig {
    pub attack_type: AttackType,
    pub start_time: f64,
    pub duration: f64,
    #[serde(default)]
    pub phantom_count: usize,
    #[serde(default)]
    pub placement: Placement,
}

impl AttackConfig {
    pub fn build(&self) -> Result<AttackScenario> {
        AttackScenario::new(self.attack_type, self.start_time, self.duration, self.phantom_count)?
            .with_placement(self.placement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Node2vec,
    GraphMetrics,
    Crypto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub methods: Vec<DetectorKind>,
    pub node2vec: EmbeddingConfig,
    pub graph_metrics: GraphMetricConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            methods: vec![DetectorKind::Node2vec],
            node2vec: EmbeddingConfig::default(),
            graph_metrics: GraphMetricConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// One fresh detector per configured method, in listed order. Randomized
    /// detectors are seeded from `seed`; `crypto` verifies against `oracle`.
    pub fn build_detectors(
        &self,
        seed: u64,
        oracle: Option<Arc<dyn AuthenticationOracle>>,
    ) -> Result<Vec<Box<dyn AnomalyDetector>>> {
        self.methods
            .iter()
            .map(|kind| -> Result<Box<dyn AnomalyDetector>> {
                let detector: Box<dyn AnomalyDetector> = match kind {
                    DetectorKind::Node2vec => Box::new(GraphEmbeddingDetector::new(self.node2vec.clone(), seed)?),
                    DetectorKind::GraphMetrics => Box::new(GraphMetricDetector::new(self.graph_metrics.clone())?),
                    DetectorKind::Crypto => Box::new(CryptoDetector::new(oracle.clone())),
                };
                Ok(detector)
            })
            .collect()
    }
}

/// Parameters a sweep may vary
pub const SWEEP_PARAMS: &[&str] = &["phantom_count", "comm_range_m", "num_uavs", "contamination"];

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("duration_s", self.experiment.duration_s)?;
        ensure_positive("dt_s", self.experiment.dt_s)?;
        self.swarm.validate()?;
        if let Some(attack) = &self.attack {
            attack.build()?;
        }
        self.detection.node2vec.validate()?;
        ensure_positive("z_threshold", self.detection.graph_metrics.z_threshold)?;
        Ok(())
    }

    /// Copy of this config with one sweepable parameter replaced.
    pub fn with_param(&self, name: &str, value: f64) -> Result<Self> {
        let mut cfg = self.clone();
        match name {
            "phantom_count" => {
                let attack = cfg
                    .attack
                    .as_mut()
                    .ok_or_else(|| SimError::invalid("phantom_count sweep needs an [attack] section"))?;
                attack.phantom_count = as_count(name, value)?;
            }
            "num_uavs" => cfg.swarm.num_uavs = as_count(name, value)?,
            "comm_range_m" => cfg.swarm.comm_range_m = ensure_at_least(name, value, 0.0)?,
            "contamination" => cfg.detection.node2vec.contamination = value,
            other => {
                return Err(SimError::invalid(format!(
                    "unknown sweep parameter {other}; expected one of {SWEEP_PARAMS:?}"
                )))
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn as_count(name: &str, value: f64) -> Result<usize> {
    ensure_at_least(name, value, 0.0)?;
    if value.fract() != 0.0 {
        return Err(SimError::invalid(format!("{name} must be a whole number, got {value}")));
    }
    Ok(value as usize)
}
