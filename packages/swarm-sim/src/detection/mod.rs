//! detection — Pluggable anomaly detectors over communication graph snapshots
//!
//! Every detector implements `AnomalyDetector { train, detect }` and returns
//! the same `DetectionResult` contract. Detectors never fail outward: an
//! empty graph, an untrained model or an internal numerical failure all
//! degrade to a well-formed empty result.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use remote_id_types::RemoteIdMessage;

use crate::graph::CommGraph;

mod crypto;
mod embedding;
mod graph_metrics;
pub mod isolation_forest;
pub mod skipgram;
pub mod walks;

pub use crypto::CryptoDetector;
pub use embedding::{normalize_confidences, EmbeddingConfig, GraphEmbeddingDetector, TrainingGraphPolicy};
pub use graph_metrics::{GraphMetricConfig, GraphMetricDetector};

pub trait AnomalyDetector {
    fn name(&self) -> &str;

    /// Fit on graphs known to be attack-free. An empty sequence or an empty
    /// graph leaves the detector untrained.
    fn train(&mut self, clean_graphs: &[CommGraph]);

    /// Score every node of `graph`. Never panics on degenerate input.
    fn detect(&self, graph: &CommGraph) -> DetectionResult;

    fn is_trained(&self) -> bool;

    /// Broadcasts heard during the step about to be scored. Graph-only
    /// detectors ignore them.
    fn observe_broadcasts(&mut self, _messages: &[RemoteIdMessage]) {}
}

// ── Result contract ───────────────────────────────────────────────────────────

/// Output of one `detect` call.
///
/// Either every node of the evaluated graph appears in both `confidence_scores`
/// and `ground_truth`, or both maps are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub detector_name: String,
    /// Wall-clock time the result was produced
    pub timestamp: DateTime<Utc>,
    /// Identities the detector flags as spoofed
    pub anomalous_uav_ids: BTreeSet<String>,
    /// Confidence in [0, 1], higher = more anomalous
    pub confidence_scores: BTreeMap<String, f64>,
    /// Legitimacy labels for offline scoring only; never read by detectors
    pub ground_truth: BTreeMap<String, bool>,
    /// Wall-clock latency of the detect call
    pub detection_time: Duration,
}

impl DetectionResult {
    /// Empty result whose latency runs from `started` until now.
    pub fn empty(detector_name: &str, started: Instant) -> Self {
        Self {
            detector_name: detector_name.to_string(),
            timestamp: Utc::now(),
            anomalous_uav_ids: BTreeSet::new(),
            confidence_scores: BTreeMap::new(),
            ground_truth: BTreeMap::new(),
            detection_time: started.elapsed(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confidence_scores.is_empty() && self.anomalous_uav_ids.is_empty()
    }

    pub fn is_flagged(&self, uav_id: &str) -> bool {
        self.anomalous_uav_ids.contains(uav_id)
    }
}

/// Ground-truth labels for every node, read from the snapshot's node attributes.
pub fn ground_truth_of(graph: &CommGraph) -> BTreeMap<String, bool> {
    graph
        .nodes()
        .map(|n| (n.uav_id.clone(), n.is_legitimate.unwrap_or(true)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CommNode;

    #[test]
    fn empty_result_is_well_formed() {
        let r = DetectionResult::empty("x", Instant::now());
        assert!(r.is_empty());
        assert!(r.ground_truth.is_empty());
        assert!(r.detection_time >= Duration::ZERO);
        assert_eq!(r.detector_name, "x");
    }

    #[test]
    fn ground_truth_defaults_unlabeled_to_legitimate() {
        let mut g = CommGraph::new(0.0);
        g.add_node(CommNode::unlabeled("A"));
        g.add_node(CommNode { is_legitimate: Some(false), ..CommNode::unlabeled("B") });
        let gt = ground_truth_of(&g);
        assert_eq!(gt.get("A"), Some(&true));
        assert_eq!(gt.get("B"), Some(&false));
    }
}
