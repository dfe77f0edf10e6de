//! uav.rs — Simulated vehicle: kinematic state, identity, legitimacy label
//!
//! Each UAV has:
//! - Position / velocity in the world frame (meters, m/s)
//! - A communication range used for link derivation
//! - A ground-truth `is_legitimate` label fixed at creation
//! - An optional signing capability (the key itself lives in the oracle)
//!
//! Kinematics are simple constant-velocity motion with a deterministic
//! boundary policy. No flight dynamics.

use remote_id_types::{RemoteIdMessage, Vec3};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticationOracle;
use crate::error::{ensure_at_least, Result, SimError};

// ── Boundary policy ───────────────────────────────────────────────────────────

/// What happens when a UAV crosses a face of the flight volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Mirror the overshoot back inside and reverse that velocity component
    #[default]
    Reflect,
    /// Re-enter from the opposite face
    Wrap,
}

impl Boundary {
    /// Apply the policy on one axis. Returns the new (position, velocity).
    fn apply(self, p: f64, v: f64, extent: f64) -> (f64, f64) {
        match self {
            Boundary::Reflect => {
                let (p, v) = if p < 0.0 {
                    (-p, -v)
                } else if p > extent {
                    (2.0 * extent - p, -v)
                } else {
                    (p, v)
                };
                // Overshoot larger than the whole extent
                (p.clamp(0.0, extent), v)
            }
            Boundary::Wrap => (p.rem_euclid(extent), v),
        }
    }
}

// ── UAV ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Uav {
    id: String,
    position: Vec3,
    velocity: Vec3,
    comm_range: f64,
    is_legitimate: bool,
    /// Whether the oracle holds a key for this identity
    can_sign: bool,
    /// Timestamp of the last emitted broadcast
    last_broadcast: Option<f64>,
}

impl Uav {
    /// Legitimate UAV. Rejects negative or non-finite range and non-finite state.
    pub fn new(id: impl Into<String>, position: Vec3, velocity: Vec3, comm_range: f64) -> Result<Self> {
        Self::build(id.into(), position, velocity, comm_range, true)
    }

    /// Phantom UAV: always illegitimate, never able to sign.
    pub fn phantom(id: impl Into<String>, position: Vec3, velocity: Vec3, comm_range: f64) -> Result<Self> {
        Self::build(id.into(), position, velocity, comm_range, false)
    }

    fn build(id: String, position: Vec3, velocity: Vec3, comm_range: f64, is_legitimate: bool) -> Result<Self> {
        ensure_at_least("comm_range", comm_range, 0.0)?;
        if id.is_empty() {
            return Err(SimError::invalid("UAV id must not be empty"));
        }
        if !position.is_finite() || !velocity.is_finite() {
            return Err(SimError::invalid(format!("UAV {id} has non-finite kinematic state")));
        }
        Ok(Self {
            id,
            position,
            velocity,
            comm_range,
            is_legitimate,
            can_sign: false,
            last_broadcast: None,
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn position(&self) -> Vec3 { self.position }
    pub fn velocity(&self) -> Vec3 { self.velocity }
    pub fn comm_range(&self) -> f64 { self.comm_range }
    pub fn is_legitimate(&self) -> bool { self.is_legitimate }
    pub fn can_sign(&self) -> bool { self.can_sign }

    /// Grant the signing capability. Phantoms are never enrolled.
    pub(crate) fn enroll_signing(&mut self) {
        self.can_sign = self.is_legitimate;
    }

    /// Constant-velocity step of `dt` seconds inside a box of `extents`.
    pub(crate) fn step(&mut self, dt: f64, extents: Vec3, boundary: Boundary) {
        let next = self.position + self.velocity * dt;
        let (x, vx) = boundary.apply(next.x, self.velocity.x, extents.x);
        let (y, vy) = boundary.apply(next.y, self.velocity.y, extents.y);
        let (z, vz) = boundary.apply(next.z, self.velocity.z, extents.z);
        self.position = Vec3::new(x, y, z);
        self.velocity = Vec3::new(vx, vy, vz);
    }

    /// Emit a Remote ID broadcast stamped at `timestamp`.
    /// Signed only when this UAV is enrolled and an oracle is supplied.
    pub fn broadcast(
        &mut self,
        timestamp: f64,
        oracle: Option<&dyn AuthenticationOracle>,
    ) -> Result<RemoteIdMessage> {
        if let Some(last) = self.last_broadcast {
            if timestamp < last {
                return Err(SimError::NonMonotonicTimestamp {
                    uav_id: self.id.clone(),
                    last,
                    requested: timestamp,
                });
            }
        }
        self.last_broadcast = Some(timestamp);

        let msg = RemoteIdMessage::new(self.id.clone(), self.position, self.velocity, timestamp);
        Ok(match oracle {
            Some(o) if self.can_sign => {
                let tag = o.sign(&self.id, &msg.signing_payload());
                msg.with_auth_tag(tag)
            }
            _ => msg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENTS: Vec3 = Vec3::new(100.0, 100.0, 10.0);

    fn uav_at(p: Vec3, v: Vec3) -> Uav {
        Uav::new("UAV-000", p, v, 50.0).unwrap()
    }

    #[test]
    fn rejects_negative_range() {
        assert!(matches!(
            Uav::new("UAV-000", Vec3::zero(), Vec3::zero(), -1.0),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(Uav::new("UAV-000", Vec3::zero(), Vec3::zero(), f64::NAN).is_err());
    }

    #[test]
    fn phantom_is_never_legitimate_or_signing() {
        let mut p = Uav::phantom("PHANTOM-000", Vec3::zero(), Vec3::zero(), 10.0).unwrap();
        p.enroll_signing();
        assert!(!p.is_legitimate());
        assert!(!p.can_sign());
    }

    #[test]
    fn constant_velocity_step() {
        let mut u = uav_at(Vec3::new(10.0, 10.0, 5.0), Vec3::new(2.0, -1.0, 0.0));
        u.step(1.5, EXTENTS, Boundary::Reflect);
        assert_eq!(u.position(), Vec3::new(13.0, 8.5, 5.0));
    }

    #[test]
    fn reflect_reverses_velocity_at_face() {
        let mut u = uav_at(Vec3::new(98.0, 50.0, 5.0), Vec3::new(5.0, 0.0, 0.0));
        u.step(1.0, EXTENTS, Boundary::Reflect);
        assert_eq!(u.position().x, 97.0);
        assert_eq!(u.velocity().x, -5.0);

        let mut u = uav_at(Vec3::new(1.0, 50.0, 1.0), Vec3::new(0.0, 0.0, -3.0));
        u.step(1.0, EXTENTS, Boundary::Reflect);
        assert_eq!(u.position().z, 2.0);
        assert_eq!(u.velocity().z, 3.0);
    }

    #[test]
    fn wrap_reenters_opposite_face() {
        let mut u = uav_at(Vec3::new(98.0, 50.0, 5.0), Vec3::new(5.0, 0.0, 0.0));
        u.step(1.0, EXTENTS, Boundary::Wrap);
        assert_eq!(u.position().x, 3.0);
        assert_eq!(u.velocity().x, 5.0);
    }

    #[test]
    fn broadcast_timestamps_are_monotonic() {
        let mut u = uav_at(Vec3::zero(), Vec3::zero());
        let msg = u.broadcast(1.0, None).unwrap();
        assert_eq!(msg.timestamp(), 1.0);
        assert!(!msg.is_authenticated());
        assert!(u.broadcast(1.0, None).is_ok());
        assert!(matches!(
            u.broadcast(0.5, None),
            Err(SimError::NonMonotonicTimestamp { .. })
        ));
    }
}
