//! attack.rs — Attack scenarios and the phantom UAV injector
//!
//! A scenario describes one attack window; the injector executes it against a
//! swarm as a per-scenario state machine:
//!
//!   Inactive ──(is_active(t))──▶ Active ──(t ≥ start + duration)──▶ Removed
//!
//! Redundant transitions (double inject, remove before inject, remove twice)
//! are absorbed as no-ops. The injector only ever removes identities it
//! created itself, so legitimate-but-odd UAVs are never touched.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use remote_id_types::Vec3;

use crate::error::{ensure_at_least, ensure_positive, Result, SimError};
use crate::swarm::Swarm;
use crate::uav::Uav;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackType {
    /// Inject ghost UAVs broadcasting fabricated identities
    Phantom,
    /// Re-broadcast captured messages later in time
    Replay,
    /// Legitimate identity lying about its position
    PositionSpoof,
}

/// Where phantoms appear when the attack starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Uniform inside the flight volume
    #[default]
    Random,
    /// Within `radius_m` (per axis) of a randomly chosen legitimate UAV, mimicking its velocity
    NearLegitimate { radius_m: f64 },
}

// ── Scenario ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttackScenario {
    attack_type: AttackType,
    start_time: f64,
    duration: f64,
    phantom_count: usize,
    placement: Placement,
}

impl AttackScenario {
    /// Rejects negative start times and non-positive durations.
    pub fn new(attack_type: AttackType, start_time: f64, duration: f64, phantom_count: usize) -> Result<Self> {
        ensure_at_least("start_time", start_time, 0.0)?;
        ensure_positive("duration", duration)?;
        Ok(Self {
            attack_type,
            start_time,
            duration,
            phantom_count,
            placement: Placement::Random,
        })
    }

    pub fn phantom(start_time: f64, duration: f64, phantom_count: usize) -> Result<Self> {
        Self::new(AttackType::Phantom, start_time, duration, phantom_count)
    }

    pub fn with_placement(mut self, placement: Placement) -> Result<Self> {
        if let Placement::NearLegitimate { radius_m } = placement {
            ensure_at_least("placement.radius_m", radius_m, 0.0)?;
        }
        self.placement = placement;
        Ok(self)
    }

    pub fn attack_type(&self) -> AttackType { self.attack_type }
    pub fn start_time(&self) -> f64 { self.start_time }
    pub fn duration(&self) -> f64 { self.duration }
    pub fn phantom_count(&self) -> usize { self.phantom_count }
    pub fn placement(&self) -> Placement { self.placement }
    pub fn end_time(&self) -> f64 { self.start_time + self.duration }

    /// start_time ≤ t < start_time + duration
    pub fn is_active(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }
}

// ── Injector ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectorState {
    Inactive,
    Active,
    Removed,
}

#[derive(Debug)]
pub struct PhantomInjector {
    scenario: AttackScenario,
    state: InjectorState,
    /// Identities this injector created and still owns
    injected: BTreeSet<String>,
}

impl PhantomInjector {
    pub fn new(scenario: AttackScenario) -> Result<Self> {
        if scenario.attack_type() != AttackType::Phantom {
            return Err(SimError::UnsupportedAttack(scenario.attack_type()));
        }
        Ok(Self { scenario, state: InjectorState::Inactive, injected: BTreeSet::new() })
    }

    pub fn scenario(&self) -> &AttackScenario { &self.scenario }
    pub fn state(&self) -> InjectorState { self.state }
    pub fn injected_ids(&self) -> &BTreeSet<String> { &self.injected }

    /// Drive the state machine from the current simulation time.
    /// Returns the state after any transition.
    pub fn update(&mut self, swarm: &mut Swarm, t: f64) -> Result<InjectorState> {
        match self.state {
            InjectorState::Inactive if self.scenario.is_active(t) => {
                self.inject(swarm)?;
            }
            InjectorState::Active if t >= self.scenario.end_time() => {
                self.remove_phantoms(swarm);
            }
            _ => {}
        }
        Ok(self.state)
    }

    /// Create `phantom_count` illegitimate UAVs and insert them into the swarm.
    /// No-op unless the injector is still inactive.
    pub fn inject(&mut self, swarm: &mut Swarm) -> Result<usize> {
        if self.state != InjectorState::Inactive {
            debug!("Phantom inject ignored in state {:?}", self.state);
            return Ok(0);
        }

        let mut phantoms = Vec::with_capacity(self.scenario.phantom_count);
        let mut serial = 0usize;
        for _ in 0..self.scenario.phantom_count {
            let id = loop {
                let candidate = format!("PHANTOM-{serial:03}");
                serial += 1;
                if !swarm.contains(&candidate) {
                    break candidate;
                }
            };
            let (position, velocity) = self.place(swarm);
            phantoms.push(Uav::phantom(id, position, velocity, swarm.comm_range())?);
        }

        let count = phantoms.len();
        for p in phantoms {
            self.injected.insert(p.id().to_string());
            swarm.insert(p)?;
        }
        self.state = InjectorState::Active;
        info!(
            "👻 Phantom attack active at t={:.2}s: {} phantoms injected",
            swarm.simulation_time(), count
        );
        Ok(count)
    }

    /// Remove every identity this injector created.
    /// No-op unless the injector is active.
    pub fn remove_phantoms(&mut self, swarm: &mut Swarm) -> usize {
        if self.state != InjectorState::Active {
            debug!("Phantom removal ignored in state {:?}", self.state);
            return 0;
        }
        let removed = std::mem::take(&mut self.injected)
            .iter()
            .filter(|id| swarm.remove(id).is_some())
            .count();
        self.state = InjectorState::Removed;
        info!("✓ Phantoms removed at t={:.2}s: {}", swarm.simulation_time(), removed);
        removed
    }

    fn place(&self, swarm: &mut Swarm) -> (Vec3, Vec3) {
        match self.scenario.placement {
            Placement::Random => (swarm.random_position(), swarm.random_velocity()),
            Placement::NearLegitimate { radius_m } => {
                let targets: Vec<(Vec3, Vec3)> = swarm
                    .uavs()
                    .filter(|u| u.is_legitimate())
                    .map(|u| (u.position(), u.velocity()))
                    .collect();
                if targets.is_empty() {
                    return (swarm.random_position(), swarm.random_velocity());
                }
                let rng = swarm.rng();
                let (anchor, velocity) = targets[rng.gen_range(0..targets.len())];
                let offset = Vec3::new(
                    rng.gen_range(-radius_m..=radius_m),
                    rng.gen_range(-radius_m..=radius_m),
                    rng.gen_range(-radius_m..=radius_m),
                );
                (swarm.clamp_to_bounds(anchor + offset), velocity)
            }
        }
    }
}
