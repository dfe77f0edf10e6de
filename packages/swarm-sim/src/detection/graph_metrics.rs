//! graph_metrics.rs — Structural baseline detector
//!
//! Learns the distribution of node degree and local clustering coefficient
//! over the clean training graphs, then flags nodes whose combined z-score
//! exceeds a threshold. Cheap, deterministic, no randomness involved.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ground_truth_of, AnomalyDetector, DetectionResult};
use crate::error::{ensure_positive, Result};
use crate::graph::{clustering_coefficients, CommGraph};

/// Floor on a baseline standard deviation so a constant metric still scores deviations
const MIN_STD: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphMetricConfig {
    /// z-score above which a node is flagged
    pub z_threshold: f64,
}

impl Default for GraphMetricConfig {
    fn default() -> Self {
        Self { z_threshold: 2.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Baseline {
    degree_mean: f64,
    degree_std: f64,
    clustering_mean: f64,
    clustering_std: f64,
}

pub struct GraphMetricDetector {
    name: String,
    config: GraphMetricConfig,
    baseline: Option<Baseline>,
}

impl GraphMetricDetector {
    pub fn new(config: GraphMetricConfig) -> Result<Self> {
        ensure_positive("z_threshold", config.z_threshold)?;
        Ok(Self { name: "graph_metrics".to_string(), config, baseline: None })
    }

    /// (degree, clustering) per node, in node order
    fn node_metrics(graph: &CommGraph) -> Vec<(f64, f64)> {
        let adj = graph.adjacency();
        let cc = clustering_coefficients(&adj);
        adj.iter().zip(cc).map(|(nb, c)| (nb.len() as f64, c)).collect()
    }

    fn z_score(&self, b: &Baseline, degree: f64, clustering: f64) -> f64 {
        let zd = (degree - b.degree_mean).abs() / b.degree_std.max(MIN_STD);
        let zc = (clustering - b.clustering_mean).abs() / b.clustering_std.max(MIN_STD);
        zd.max(zc)
    }
}

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count() as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

impl AnomalyDetector for GraphMetricDetector {
    fn name(&self) -> &str { &self.name }

    fn is_trained(&self) -> bool { self.baseline.is_some() }

    fn train(&mut self, clean_graphs: &[CommGraph]) {
        let samples: Vec<(f64, f64)> = clean_graphs.iter().flat_map(Self::node_metrics).collect();
        if samples.is_empty() {
            warn!("{}: no clean nodes to build a baseline from", self.name);
            self.baseline = None;
            return;
        }
        let (degree_mean, degree_std) = mean_std(samples.iter().map(|s| s.0));
        let (clustering_mean, clustering_std) = mean_std(samples.iter().map(|s| s.1));
        self.baseline = Some(Baseline { degree_mean, degree_std, clustering_mean, clustering_std });
        info!(
            "{}: baseline over {} nodes: degree {:.2}±{:.2}, clustering {:.2}±{:.2}",
            self.name, samples.len(), degree_mean, degree_std, clustering_mean, clustering_std
        );
    }

    fn detect(&self, graph: &CommGraph) -> DetectionResult {
        let started = Instant::now();
        let Some(b) = self.baseline else {
            warn!("{}: detect called before training", self.name);
            return DetectionResult::empty(&self.name, started);
        };
        if graph.is_empty() {
            return DetectionResult::empty(&self.name, started);
        }

        let mut result = DetectionResult::empty(&self.name, started);
        for (node, (degree, clustering)) in graph.nodes().zip(Self::node_metrics(graph)) {
            let z = self.z_score(&b, degree, clustering);
            if z > self.config.z_threshold {
                result.anomalous_uav_ids.insert(node.uav_id.clone());
            }
            result.confidence_scores.insert(node.uav_id.clone(), z / (z + self.config.z_threshold));
        }
        result.ground_truth = ground_truth_of(graph);
        result.timestamp = Utc::now();
        result.detection_time = started.elapsed();
        debug!("{}: {} anomalies detected", self.name, result.anomalous_uav_ids.len());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CommNode;

    fn ring(n: usize) -> CommGraph {
        let mut g = CommGraph::new(0.0);
        for i in 0..n {
            g.add_node(CommNode::unlabeled(format!("N{i}")));
        }
        for i in 0..n {
            g.add_edge(&format!("N{i}"), &format!("N{}", (i + 1) % n), 1.0);
        }
        g
    }

    #[test]
    fn hub_node_is_flagged() {
        let mut d = GraphMetricDetector::new(GraphMetricConfig::default()).unwrap();
        d.train(&[ring(8), ring(10)]);

        let mut g = ring(8);
        g.add_node(CommNode { is_legitimate: Some(false), ..CommNode::unlabeled("HUB") });
        for i in 0..8 {
            g.add_edge("HUB", &format!("N{i}"), 1.0);
        }
        let r = d.detect(&g);
        assert!(r.is_flagged("HUB"));
        assert_eq!(r.ground_truth.get("HUB"), Some(&false));
        assert_eq!(r.confidence_scores.len(), 9);
        assert!(r.confidence_scores.values().all(|c| (0.0..1.0).contains(c)));
    }

    #[test]
    fn matching_graph_is_quiet() {
        let mut d = GraphMetricDetector::new(GraphMetricConfig::default()).unwrap();
        d.train(&[ring(6)]);
        let r = d.detect(&ring(6));
        assert!(r.anomalous_uav_ids.is_empty());
        assert!(r.confidence_scores.values().all(|&c| c == 0.0));
    }

    #[test]
    fn degrades_without_training_or_nodes() {
        let mut d = GraphMetricDetector::new(GraphMetricConfig::default()).unwrap();
        assert!(d.detect(&ring(3)).is_empty());
        d.train(&[CommGraph::new(0.0)]);
        assert!(!d.is_trained());
        d.train(&[ring(3)]);
        assert!(d.detect(&CommGraph::new(0.0)).is_empty());
        assert!(GraphMetricDetector::new(GraphMetricConfig { z_threshold: 0.0 }).is_err());
    }
}
