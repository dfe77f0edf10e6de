//! embedding.rs — Node2Vec + isolation forest detector
//!
//! Training: biased walks on a representative clean graph → skip-gram
//! embeddings → isolation forest fitted on those embeddings.
//!
//! Detection: the current graph gets its own fresh walks and embedding model
//! (embeddings are graph-specific), the trained forest scores each node, and
//! raw decision values are min-max scaled into inverted confidences.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::isolation_forest::{ForestParams, IsolationForest};
use super::skipgram::{train_embeddings, SkipGramParams};
use super::walks::{generate_walks, WalkParams};
use super::{ground_truth_of, AnomalyDetector, DetectionResult};
use crate::error::{ensure_positive, DetectionError, Result, SimError};
use crate::graph::CommGraph;

/// Confidence assigned to every node when a batch has no score spread
const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Which clean graph the model is trained on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingGraphPolicy {
    /// Most recent graph in the sequence
    #[default]
    Last,
    /// Graph at this position; out of range falls back to the last one
    Index(usize),
}

impl TrainingGraphPolicy {
    pub fn select<'a>(&self, graphs: &'a [CommGraph]) -> Option<&'a CommGraph> {
        match *self {
            TrainingGraphPolicy::Last => graphs.last(),
            TrainingGraphPolicy::Index(i) => graphs.get(i).or_else(|| graphs.last()),
        }
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub embedding_dim: usize,
    pub walk_length: usize,
    pub num_walks: usize,
    /// Return parameter
    pub p: f64,
    /// In-out parameter
    pub q: f64,
    pub window: usize,
    pub negative: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub contamination: f64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub training_graph: TrainingGraphPolicy,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 128,
            walk_length: 30,
            num_walks: 200,
            p: 1.0,
            q: 1.0,
            window: 10,
            negative: 5,
            epochs: 5,
            learning_rate: 0.025,
            contamination: 0.1,
            n_estimators: 100,
            max_samples: 256,
            training_graph: TrainingGraphPolicy::Last,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("embedding_dim", self.embedding_dim),
            ("walk_length", self.walk_length),
            ("num_walks", self.num_walks),
            ("window", self.window),
            ("epochs", self.epochs),
            ("n_estimators", self.n_estimators),
            ("max_samples", self.max_samples),
        ] {
            if v == 0 {
                return Err(SimError::invalid(format!("{name} must be > 0")));
            }
        }
        ensure_positive("p", self.p)?;
        ensure_positive("q", self.q)?;
        ensure_positive("learning_rate", self.learning_rate)?;
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(SimError::invalid(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        Ok(())
    }

    fn walk_params(&self) -> WalkParams {
        WalkParams { walk_length: self.walk_length, num_walks: self.num_walks, p: self.p, q: self.q }
    }

    fn skipgram_params(&self) -> SkipGramParams {
        SkipGramParams {
            dimensions: self.embedding_dim,
            window: self.window,
            negative: self.negative,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            min_learning_rate: self.learning_rate.min(0.0001),
        }
    }

    fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            contamination: self.contamination,
        }
    }
}

// ── Detector ──────────────────────────────────────────────────────────────────

pub struct GraphEmbeddingDetector {
    name: String,
    config: EmbeddingConfig,
    /// Root of every RNG the detector forks
    seed: u64,
    forest: Option<IsolationForest>,
    /// Embeddings of the training graph, by identity
    baseline: BTreeMap<String, Vec<f64>>,
}

impl GraphEmbeddingDetector {
    pub fn new(config: EmbeddingConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self { name: "node2vec".to_string(), config, seed, forest: None, baseline: BTreeMap::new() })
    }

    pub fn config(&self) -> &EmbeddingConfig { &self.config }
    pub fn baseline_embeddings(&self) -> &BTreeMap<String, Vec<f64>> { &self.baseline }

    /// Walks + skip-gram for `graph`, one (identity, vector) per node in node order.
    /// Deterministic: a fresh RNG tree is forked from the detector seed on every call.
    pub fn embed(&self, graph: &CommGraph) -> std::result::Result<Vec<(String, Vec<f64>)>, DetectionError> {
        if graph.is_empty() {
            return Err(DetectionError::EmptyEmbedding);
        }
        let mut root = StdRng::seed_from_u64(self.seed);
        let mut walk_rng = StdRng::seed_from_u64(root.gen());
        let mut sg_rng = StdRng::seed_from_u64(root.gen());

        let walks = generate_walks(&graph.adjacency(), &self.config.walk_params(), &mut walk_rng);
        let vectors = train_embeddings(&walks, graph.node_count(), &self.config.skipgram_params(), &mut sg_rng)?;

        Ok(graph.nodes().map(|n| n.uav_id.clone()).zip(vectors).collect())
    }

    fn try_train(&mut self, graph: &CommGraph) -> std::result::Result<usize, DetectionError> {
        let embedded = self.embed(graph)?;
        let data: Vec<Vec<f64>> = embedded.iter().map(|(_, v)| v.clone()).collect();

        let mut forest_rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let forest = IsolationForest::fit(&data, &self.config.forest_params(), &mut forest_rng)?;

        self.baseline = embedded.into_iter().collect();
        self.forest = Some(forest);
        Ok(data.len())
    }

    /// Flagged set and confidence map for every node of `graph`.
    fn score(
        &self,
        forest: &IsolationForest,
        graph: &CommGraph,
    ) -> std::result::Result<(BTreeSet<String>, BTreeMap<String, f64>), DetectionError> {
        let embedded = self.embed(graph)?;
        let (ids, data): (Vec<String>, Vec<Vec<f64>>) = embedded.into_iter().unzip();

        let raw = forest.decision_function(&data)?;
        if let Some(i) = raw.iter().position(|s| !s.is_finite()) {
            return Err(DetectionError::NonFiniteScore(ids[i].clone()));
        }
        let confidences = normalize_confidences(&raw);

        let flagged = ids
            .iter()
            .zip(forest.predict(&data)?)
            .filter(|(_, outlier)| *outlier)
            .map(|(id, _)| id.clone())
            .collect();
        Ok((flagged, ids.into_iter().zip(confidences).collect()))
    }
}

impl AnomalyDetector for GraphEmbeddingDetector {
    fn name(&self) -> &str { &self.name }

    fn is_trained(&self) -> bool { self.forest.is_some() }

    fn train(&mut self, clean_graphs: &[CommGraph]) {
        self.forest = None;
        self.baseline.clear();

        let Some(graph) = self.config.training_graph.select(clean_graphs) else {
            warn!("{}: no clean graphs provided for training", self.name);
            return;
        };
        if graph.is_empty() {
            warn!("{}: training graph is empty", self.name);
            return;
        }

        info!("{}: training on graph with {} nodes", self.name, graph.node_count());
        match self.try_train(graph) {
            Ok(n) => info!("{}: trained on {} node embeddings", self.name, n),
            Err(e) => error!("{}: training failed: {e}", self.name),
        }
    }

    fn detect(&self, graph: &CommGraph) -> DetectionResult {
        let started = Instant::now();

        let Some(forest) = self.forest.as_ref() else {
            warn!("{}: detect called before successful training", self.name);
            return DetectionResult::empty(&self.name, started);
        };
        if graph.is_empty() {
            return DetectionResult::empty(&self.name, started);
        }

        match self.score(forest, graph) {
            Ok((anomalous_uav_ids, confidence_scores)) => {
                debug!("{}: {} anomalies detected", self.name, anomalous_uav_ids.len());
                DetectionResult {
                    detector_name: self.name.clone(),
                    timestamp: Utc::now(),
                    anomalous_uav_ids,
                    confidence_scores,
                    ground_truth: ground_truth_of(graph),
                    detection_time: started.elapsed(),
                }
            }
            Err(e) => {
                error!("{}: detection failed: {e}", self.name);
                DetectionResult::empty(&self.name, started)
            }
        }
    }
}

/// Min-max scale raw decision values into [0, 1], inverted so the lowest raw
/// score gets confidence 1. A batch with no spread gets 0.5 everywhere.
pub fn normalize_confidences(raw: &[f64]) -> Vec<f64> {
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    raw.iter()
        .map(|&s| {
            if range > 0.0 {
                (1.0 - (s - min) / range).clamp(0.0, 1.0)
            } else {
                NEUTRAL_CONFIDENCE
            }
        })
        .collect()
}
