//! swarm_sim — UAV swarm Remote ID spoofing simulator and phantom detectors
//!
//! The simulation side (`swarm`, `uav`, `attack`) produces communication graph
//! snapshots; the detection side (`detection`) consumes only those snapshots.
//! `runner` wires both into time-stepped experiments and `metrics` scores them.

pub mod attack;
pub mod auth;
pub mod config;
pub mod detection;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod runner;
pub mod swarm;
pub mod uav;

pub use remote_id_types::{RemoteIdMessage, Vec3};

pub use attack::{AttackScenario, AttackType, InjectorState, PhantomInjector, Placement};
pub use auth::{oracle_for, AuthScheme, AuthenticationOracle, Ed25519Oracle, HmacOracle};
pub use config::ExperimentConfig;
pub use detection::{AnomalyDetector, CryptoDetector, DetectionResult, EmbeddingConfig, GraphEmbeddingDetector};
pub use error::{DetectionError, Result, SimError};
pub use graph::{CommGraph, CommNode, LinkPolicy};
pub use runner::{ExperimentResults, ExperimentRunner};
pub use swarm::{Swarm, SwarmConfig};
pub use uav::{Boundary, Uav};
