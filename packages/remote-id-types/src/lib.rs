//! # remote-id-types
//!
//! Shared Remote ID broadcast structures for the swarm spoofing simulator.
//!
//! These types are used by:
//! - `swarm-sim`: UAVs emit a `RemoteIdMessage` every broadcast tick
//! - the authentication oracle: signs and verifies `RemoteIdMessage::signing_payload`
//! - external evaluators/renderers: consume serialized messages and positions
//!
//! ## Coordinate Conventions
//!
//! - **World frame**: local Cartesian box anchored at the origin, meters
//! - x, y span the horizontal extents of the flight volume, z is altitude
//!
//! ## Invariants
//! - A message is immutable once built; the auth tag is attached at construction
//! - Timestamps are monotonically non-decreasing per sender within a session
//!   (enforced by the emitting UAV, not by this crate)

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

// ── 3D Vector ─────────────────────────────────────────────────────────────────

/// 3D vector in the world frame (meters, or m/s for velocities)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    pub const fn zero() -> Self { Self { x: 0.0, y: 0.0, z: 0.0 } }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point
    pub fn dist(&self, other: &Vec3) -> f64 {
        (*self - *other).norm()
    }

    pub fn scale(&self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Components as an array, x first
    pub fn to_array(self) -> [f64; 3] { [self.x, self.y, self.z] }

    pub fn from_array(a: [f64; 3]) -> Self { Self::new(a[0], a[1], a[2]) }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 { Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z) }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 { Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z) }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 { self.scale(rhs) }
}

// ── Remote ID Broadcast ───────────────────────────────────────────────────────

/// One identity/telemetry assertion broadcast by a UAV.
///
/// Built once per broadcast tick and never mutated afterwards. Receivers
/// consume it within the tick; nothing in the core retains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIdMessage {
    /// Claimed sender identity
    uav_id: String,
    /// Claimed position (meters, world frame)
    position: Vec3,
    /// Claimed velocity (m/s, world frame)
    velocity: Vec3,
    /// Simulation time of the broadcast, seconds
    timestamp: f64,
    /// Opaque authentication tag from the signing oracle, if the sender holds a key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_tag: Option<Vec<u8>>,
}

impl RemoteIdMessage {
    pub fn new(uav_id: impl Into<String>, position: Vec3, velocity: Vec3, timestamp: f64) -> Self {
        Self {
            uav_id: uav_id.into(),
            position,
            velocity,
            timestamp,
            auth_tag: None,
        }
    }

    /// Consume the unsigned message and return it carrying `tag`.
    pub fn with_auth_tag(mut self, tag: Vec<u8>) -> Self {
        self.auth_tag = Some(tag);
        self
    }

    pub fn uav_id(&self) -> &str { &self.uav_id }
    pub fn position(&self) -> Vec3 { self.position }
    pub fn velocity(&self) -> Vec3 { self.velocity }
    pub fn timestamp(&self) -> f64 { self.timestamp }
    pub fn auth_tag(&self) -> Option<&[u8]> { self.auth_tag.as_deref() }
    pub fn is_authenticated(&self) -> bool { self.auth_tag.is_some() }

    /// Canonical bytes covered by the authentication tag.
    ///
    /// Layout: id length (u32 LE) || id bytes || position xyz || velocity xyz || timestamp,
    /// every float as f64 little-endian. The tag itself is never part of the payload.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.uav_id.len() + 7 * 8);
        buf.extend_from_slice(&(self.uav_id.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.uav_id.as_bytes());
        for v in self.position.to_array().iter().chain(self.velocity.to_array().iter()) {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RemoteIdMessage {
        RemoteIdMessage::new(
            "UAV-001",
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::new(1.0, -1.0, 0.5),
            4.0,
        )
    }

    #[test]
    fn vector_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 2.0);
        assert_eq!(a.norm(), 3.0);
        assert_eq!(a + a, Vec3::new(2.0, 4.0, 4.0));
        assert_eq!(a - a, Vec3::zero());
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 4.0));
        assert_eq!(Vec3::zero().dist(&Vec3::new(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn payload_excludes_tag() {
        let unsigned = sample();
        let signed = sample().with_auth_tag(vec![0xAB; 32]);
        assert!(!unsigned.is_authenticated());
        assert!(signed.is_authenticated());
        assert_eq!(unsigned.signing_payload(), signed.signing_payload());
    }

    #[test]
    fn payload_changes_with_claims() {
        let a = sample();
        let b = RemoteIdMessage::new("UAV-001", Vec3::new(10.0, 20.0, 31.0), a.velocity(), 4.0);
        assert_ne!(a.signing_payload(), b.signing_payload());
    }

    #[test]
    fn unsigned_message_omits_tag_in_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("auth_tag").is_none());
        assert_eq!(json["uav_id"], "UAV-001");
    }
}
