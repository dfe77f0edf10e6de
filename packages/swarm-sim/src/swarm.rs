//! swarm.rs — UAV population, simulation clock and graph snapshots
//!
//! The swarm exclusively owns every UAV (legitimate or phantom) and the RNG
//! used for stochastic placement. Two swarms built from the same config and
//! seed produce identical trajectories and identical graphs.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use remote_id_types::{RemoteIdMessage, Vec3};

use crate::auth::AuthenticationOracle;
use crate::error::{ensure_at_least, ensure_positive, Result, SimError};
use crate::graph::{CommGraph, LinkPolicy};
use crate::uav::{Boundary, Uav};

/// Fraction of `max_speed_mps` allowed on the vertical axis
const VERTICAL_SPEED_FACTOR: f64 = 0.1;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub num_uavs: usize,
    /// Default communication range for every legitimate UAV (meters)
    pub comm_range_m: f64,
    /// Flight volume extents [x, y, z] (meters)
    pub bounds_m: [f64; 3],
    /// Per-axis horizontal speed limit for initial velocities (m/s)
    pub max_speed_mps: f64,
    pub link_policy: LinkPolicy,
    pub boundary: Boundary,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            num_uavs: 20,
            comm_range_m: 200.0,
            bounds_m: [1000.0, 1000.0, 200.0],
            max_speed_mps: 10.0,
            link_policy: LinkPolicy::MinRange,
            boundary: Boundary::Reflect,
        }
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_at_least("comm_range_m", self.comm_range_m, 0.0)?;
        ensure_at_least("max_speed_mps", self.max_speed_mps, 0.0)?;
        for (axis, b) in ["x", "y", "z"].iter().zip(self.bounds_m) {
            ensure_positive(&format!("bounds_m.{axis}"), b)?;
        }
        Ok(())
    }
}

// ── Swarm ─────────────────────────────────────────────────────────────────────

pub struct Swarm {
    uavs: BTreeMap<String, Uav>,
    extents: Vec3,
    comm_range: f64,
    max_speed: f64,
    link_policy: LinkPolicy,
    boundary: Boundary,
    simulation_time: f64,
    step_count: u64,
    rng: StdRng,
    oracle: Option<Arc<dyn AuthenticationOracle>>,
}

impl Swarm {
    /// Build and populate a swarm. All placement draws come from `rng`.
    pub fn new(config: &SwarmConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let mut swarm = Self {
            uavs: BTreeMap::new(),
            extents: Vec3::from_array(config.bounds_m),
            comm_range: config.comm_range_m,
            max_speed: config.max_speed_mps,
            link_policy: config.link_policy,
            boundary: config.boundary,
            simulation_time: 0.0,
            step_count: 0,
            rng,
            oracle: None,
        };

        for i in 0..config.num_uavs {
            let position = swarm.random_position();
            let velocity = swarm.random_velocity();
            swarm.insert(Uav::new(format!("UAV-{i:03}"), position, velocity, config.comm_range_m)?)?;
        }

        info!(
            "Swarm initialised: {} UAVs, range {}m, bounds {:?}",
            swarm.uavs.len(), config.comm_range_m, config.bounds_m
        );
        Ok(swarm)
    }

    pub fn with_seed(config: &SwarmConfig, seed: u64) -> Result<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Attach a signing oracle and enroll every legitimate UAV currently in the swarm.
    pub fn with_oracle(mut self, oracle: Arc<dyn AuthenticationOracle>) -> Self {
        for uav in self.uavs.values_mut() {
            uav.enroll_signing();
        }
        self.oracle = Some(oracle);
        self
    }

    // ── Time stepping ─────────────────────────────────────────────────────────

    /// Move every UAV by `velocity * dt` and advance the clock.
    pub fn advance(&mut self, dt: f64) -> Result<()> {
        ensure_positive("dt", dt)?;
        for uav in self.uavs.values_mut() {
            uav.step(dt, self.extents, self.boundary);
        }
        self.simulation_time += dt;
        self.step_count += 1;
        debug!("t={:.2}s step={} uavs={}", self.simulation_time, self.step_count, self.uavs.len());
        Ok(())
    }

    /// Fresh communication graph from current positions.
    pub fn snapshot_graph(&self) -> CommGraph {
        CommGraph::build(self.uavs.values(), self.link_policy, self.simulation_time)
    }

    /// One Remote ID message per UAV, stamped with the current clock.
    pub fn broadcast_all(&mut self) -> Result<Vec<RemoteIdMessage>> {
        let t = self.simulation_time;
        let oracle = self.oracle.as_deref();
        self.uavs.values_mut().map(|u| u.broadcast(t, oracle)).collect()
    }

    // ── Membership ────────────────────────────────────────────────────────────

    pub(crate) fn insert(&mut self, uav: Uav) -> Result<()> {
        if self.uavs.contains_key(uav.id()) {
            return Err(SimError::DuplicateIdentity(uav.id().to_string()));
        }
        self.uavs.insert(uav.id().to_string(), uav);
        Ok(())
    }

    pub(crate) fn remove(&mut self, uav_id: &str) -> Option<Uav> {
        self.uavs.remove(uav_id)
    }

    pub fn len(&self) -> usize { self.uavs.len() }
    pub fn is_empty(&self) -> bool { self.uavs.is_empty() }
    pub fn contains(&self, uav_id: &str) -> bool { self.uavs.contains_key(uav_id) }
    pub fn get(&self, uav_id: &str) -> Option<&Uav> { self.uavs.get(uav_id) }

    /// UAVs in identity order
    pub fn uavs(&self) -> impl Iterator<Item = &Uav> { self.uavs.values() }

    pub fn ids(&self) -> impl Iterator<Item = &str> { self.uavs.keys().map(String::as_str) }

    pub fn legitimate_ids(&self) -> Vec<&str> {
        self.uavs.values().filter(|u| u.is_legitimate()).map(Uav::id).collect()
    }

    pub fn simulation_time(&self) -> f64 { self.simulation_time }
    pub fn step_count(&self) -> u64 { self.step_count }
    pub fn extents(&self) -> Vec3 { self.extents }
    pub fn comm_range(&self) -> f64 { self.comm_range }
    pub fn oracle(&self) -> Option<&dyn AuthenticationOracle> { self.oracle.as_deref() }

    // ── Stochastic draws (single RNG source) ──────────────────────────────────

    pub(crate) fn random_position(&mut self) -> Vec3 {
        let e = self.extents;
        Vec3::new(
            self.rng.gen_range(0.0..=e.x),
            self.rng.gen_range(0.0..=e.y),
            self.rng.gen_range(0.0..=e.z),
        )
    }

    pub(crate) fn random_velocity(&mut self) -> Vec3 {
        let horizontal = Uniform::new_inclusive(-self.max_speed, self.max_speed);
        let vz = self.max_speed * VERTICAL_SPEED_FACTOR;
        let vertical = Uniform::new_inclusive(-vz, vz);
        Vec3::new(
            horizontal.sample(&mut self.rng),
            horizontal.sample(&mut self.rng),
            vertical.sample(&mut self.rng),
        )
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng { &mut self.rng }

    /// Clamp a point into the flight volume
    pub(crate) fn clamp_to_bounds(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(0.0, self.extents.x),
            p.y.clamp(0.0, self.extents.y),
            p.z.clamp(0.0, self.extents.z),
        )
    }
}
