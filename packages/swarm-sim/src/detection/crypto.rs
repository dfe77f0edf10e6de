//! crypto.rs — Authentication-tag detector
//!
//! Flags every node whose Remote ID broadcast in the current step does not
//! verify against the fleet's authentication oracle. Needs no training; with
//! no oracle attached it has nothing to check and returns empty results.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use remote_id_types::RemoteIdMessage;

use super::{ground_truth_of, AnomalyDetector, DetectionResult};
use crate::auth::AuthenticationOracle;
use crate::graph::CommGraph;

pub struct CryptoDetector {
    name: String,
    oracle: Option<Arc<dyn AuthenticationOracle>>,
    /// Verification outcome of the latest broadcast heard per identity
    verified: BTreeMap<String, bool>,
}

impl CryptoDetector {
    pub fn new(oracle: Option<Arc<dyn AuthenticationOracle>>) -> Self {
        Self { name: "crypto".to_string(), oracle, verified: BTreeMap::new() }
    }
}

impl AnomalyDetector for CryptoDetector {
    fn name(&self) -> &str { &self.name }

    fn is_trained(&self) -> bool { self.oracle.is_some() }

    fn train(&mut self, _clean_graphs: &[CommGraph]) {}

    fn observe_broadcasts(&mut self, messages: &[RemoteIdMessage]) {
        self.verified.clear();
        let Some(oracle) = self.oracle.as_deref() else { return };
        for msg in messages {
            self.verified.insert(msg.uav_id().to_string(), oracle.verify(msg));
        }
    }

    fn detect(&self, graph: &CommGraph) -> DetectionResult {
        let started = Instant::now();
        if self.oracle.is_none() {
            warn!("{}: no authentication oracle attached", self.name);
            return DetectionResult::empty(&self.name, started);
        }
        if graph.is_empty() {
            return DetectionResult::empty(&self.name, started);
        }

        let mut result = DetectionResult::empty(&self.name, started);
        for node in graph.nodes() {
            // silence this step counts as an unverified claim
            let ok = self.verified.get(&node.uav_id).copied().unwrap_or(false);
            if !ok {
                result.anomalous_uav_ids.insert(node.uav_id.clone());
            }
            result.confidence_scores.insert(node.uav_id.clone(), if ok { 0.0 } else { 1.0 });
        }
        result.ground_truth = ground_truth_of(graph);
        result.timestamp = Utc::now();
        result.detection_time = started.elapsed();
        debug!("{}: {} unauthenticated broadcasts", self.name, result.anomalous_uav_ids.len());
        result
    }
}
