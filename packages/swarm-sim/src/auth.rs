//! auth.rs — Pluggable authentication oracle for Remote ID broadcasts
//!
//! The swarm consults an oracle when signing is enabled; the `crypto`
//! detector consults it to verify what was heard. Two schemes:
//!   - `Ed25519Oracle`: per-identity Ed25519 keys derived from a fleet secret
//!   - `HmacOracle`: one shared HMAC-SHA256 key for the whole fleet
//!
//! Tags cover `len(uav_id) || uav_id || RemoteIdMessage::signing_payload()`,
//! so a tag lifted from one identity never verifies for another.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use remote_id_types::RemoteIdMessage;

use crate::error::{Result, SimError};

type HmacSha256 = Hmac<Sha256>;

pub trait AuthenticationOracle: Send + Sync {
    /// Produce an opaque tag over `payload` on behalf of `uav_id`.
    fn sign(&self, uav_id: &str, payload: &[u8]) -> Vec<u8>;

    /// Check the tag carried by `msg`. Unsigned messages never verify.
    fn verify(&self, msg: &RemoteIdMessage) -> bool;

    /// Short hex fingerprint of the key material, safe to log.
    fn key_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    #[default]
    Ed25519,
    Hmac,
}

/// Oracle for `scheme` whose key material is derived from `seed`.
pub fn oracle_for(scheme: AuthScheme, seed: u64) -> Result<Arc<dyn AuthenticationOracle>> {
    Ok(match scheme {
        AuthScheme::Ed25519 => Arc::new(Ed25519Oracle::from_seed(seed)),
        AuthScheme::Hmac => Arc::new(HmacOracle::from_seed(seed)?),
    })
}

fn digest32(hasher: Sha256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn fleet_secret(label: &[u8], seed: u64) -> [u8; 32] {
    digest32(Sha256::new().chain_update(label).chain_update(seed.to_le_bytes()))
}

fn identity_prefix(uav_id: &str) -> [u8; 4] {
    (uav_id.len() as u32).to_le_bytes()
}

// ── HMAC-SHA256 ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct HmacOracle {
    mac: HmacSha256,
    key_id: String,
}

impl HmacOracle {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| SimError::invalid(format!("HMAC key rejected: {e}")))?;
        let key_id = hex::encode(&Sha256::digest(secret)[..4]);
        Ok(Self { mac, key_id })
    }

    pub fn from_seed(seed: u64) -> Result<Self> {
        Self::new(&fleet_secret(b"swarm-sim/hmac-oracle", seed))
    }

    fn keyed(&self, uav_id: &str, payload: &[u8]) -> HmacSha256 {
        self.mac
            .clone()
            .chain_update(identity_prefix(uav_id))
            .chain_update(uav_id.as_bytes())
            .chain_update(payload)
    }
}

impl fmt::Debug for HmacOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacOracle").field("key_id", &self.key_id).finish()
    }
}

impl AuthenticationOracle for HmacOracle {
    fn sign(&self, uav_id: &str, payload: &[u8]) -> Vec<u8> {
        self.keyed(uav_id, payload).finalize().into_bytes().to_vec()
    }

    fn verify(&self, msg: &RemoteIdMessage) -> bool {
        let Some(tag) = msg.auth_tag() else { return false };
        self.keyed(msg.uav_id(), &msg.signing_payload()).verify_slice(tag).is_ok()
    }

    fn key_id(&self) -> String { self.key_id.clone() }
}

// ── Ed25519 ───────────────────────────────────────────────────────────────────

/// Holds the fleet secret each identity's signing key is derived from.
/// Verification uses only the derived public half.
#[derive(Clone)]
pub struct Ed25519Oracle {
    fleet_secret: [u8; 32],
}

impl Ed25519Oracle {
    pub fn new(fleet_secret: [u8; 32]) -> Self {
        Self { fleet_secret }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(fleet_secret(b"swarm-sim/ed25519-oracle", seed))
    }

    fn signing_key(&self, uav_id: &str) -> SigningKey {
        let seed = digest32(
            Sha256::new()
                .chain_update(self.fleet_secret)
                .chain_update(identity_prefix(uav_id))
                .chain_update(uav_id.as_bytes()),
        );
        SigningKey::from_bytes(&seed)
    }

    fn signed_bytes(uav_id: &str, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + uav_id.len() + payload.len());
        buf.extend_from_slice(&identity_prefix(uav_id));
        buf.extend_from_slice(uav_id.as_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    /// Hex public key registered for `uav_id`
    pub fn public_key_hex(&self, uav_id: &str) -> String {
        hex::encode(self.signing_key(uav_id).verifying_key().to_bytes())
    }
}

impl fmt::Debug for Ed25519Oracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Oracle").field("key_id", &self.key_id()).finish()
    }
}

impl AuthenticationOracle for Ed25519Oracle {
    fn sign(&self, uav_id: &str, payload: &[u8]) -> Vec<u8> {
        let signature = self.signing_key(uav_id).sign(&Self::signed_bytes(uav_id, payload));
        signature.to_bytes().to_vec()
    }

    fn verify(&self, msg: &RemoteIdMessage) -> bool {
        let Some(tag) = msg.auth_tag() else { return false };
        let Ok(signature) = Signature::from_slice(tag) else { return false };
        let verifying_key = self.signing_key(msg.uav_id()).verifying_key();
        verifying_key
            .verify(&Self::signed_bytes(msg.uav_id(), &msg.signing_payload()), &signature)
            .is_ok()
    }

    fn key_id(&self) -> String {
        hex::encode(&Sha256::digest(self.fleet_secret)[..4])
    }
}
