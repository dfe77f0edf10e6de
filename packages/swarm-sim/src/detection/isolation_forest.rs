//! isolation_forest.rs — Isolation forest outlier scoring
//!
//! Ensemble of random partition trees, each grown on a subsample without
//! replacement. A point's anomaly score is s = 2^(−E[h(x)] / c(ψ)), where
//! h is the isolation depth (plus c(leaf size) for unresolved leaves) and ψ
//! the subsample size. Shorter paths ⇒ s closer to 1 ⇒ more anomalous.
//!
//! Decision function = −s − offset, where offset is the `contamination`
//! percentile of the training scores; negative decisions are outliers.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;

use crate::error::DetectionError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Upper bound on the per-tree subsample (ψ = min(max_samples, n))
    pub max_samples: usize,
    /// Expected outlier fraction, in (0, 0.5]
    pub contamination: f64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_estimators: 100, max_samples: 256, contamination: 0.1 }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { size: usize },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<Tree>,
    sample_size: usize,
    dims: usize,
    offset: f64,
}

/// Average unsuccessful-search path length in a BST of n points, c(n).
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationForest {
    pub fn fit(data: &[Vec<f64>], params: &ForestParams, rng: &mut StdRng) -> Result<Self, DetectionError> {
        let Some(first) = data.first() else {
            return Err(DetectionError::EmptyEmbedding);
        };
        let dims = first.len();
        if let Some(bad) = data.iter().find(|x| x.len() != dims) {
            return Err(DetectionError::DimensionMismatch { expected: dims, got: bad.len() });
        }

        let sample_size = params.max_samples.min(data.len()).max(1);
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let sample = index::sample(rng, data.len(), sample_size).into_vec();
                let mut tree = Tree { nodes: Vec::new() };
                grow(&mut tree, data, sample, 0, height_limit, rng);
                tree
            })
            .collect();

        let mut forest = Self { trees, sample_size, dims, offset: 0.0 };
        let train_scores = forest.score_samples(data)?;
        forest.offset = percentile(&train_scores, 100.0 * params.contamination);
        Ok(forest)
    }

    pub fn dims(&self) -> usize { self.dims }
    pub fn offset(&self) -> f64 { self.offset }

    /// −s for each row: in [−1, 0], lower = more anomalous
    pub fn score_samples(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, DetectionError> {
        // ψ = 1 gives c(ψ) = 0; every path is 0 so any positive norm works
        let norm = average_path_length(self.sample_size).max(1.0);
        data.iter()
            .map(|x| {
                if x.len() != self.dims {
                    return Err(DetectionError::DimensionMismatch { expected: self.dims, got: x.len() });
                }
                let mean_h = self.trees.iter().map(|t| path_length(t, x)).sum::<f64>() / self.trees.len() as f64;
                Ok(-(2f64.powf(-mean_h / norm)))
            })
            .collect()
    }

    /// Shifted score: negative ⇒ outlier
    pub fn decision_function(&self, data: &[Vec<f64>]) -> Result<Vec<f64>, DetectionError> {
        Ok(self.score_samples(data)?.into_iter().map(|s| s - self.offset).collect())
    }

    /// true ⇒ outlier
    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<bool>, DetectionError> {
        Ok(self.decision_function(data)?.into_iter().map(|d| d < 0.0).collect())
    }
}

/// Grow the subtree for `rows`; returns the index of its root node.
fn grow(tree: &mut Tree, data: &[Vec<f64>], rows: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> usize {
    let id = tree.nodes.len();
    tree.nodes.push(Node::Leaf { size: rows.len() });
    if depth >= limit || rows.len() <= 1 {
        return id;
    }

    // only features that still vary can split
    let dims = data[rows[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..dims)
        .filter_map(|f| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                (lo.min(data[r][f]), hi.max(data[r][f]))
            });
            (lo < hi).then_some((f, lo, hi))
        })
        .collect();
    if ranges.is_empty() {
        return id;
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&r| data[r][feature] <= threshold);

    let left = grow(tree, data, left_rows, depth + 1, limit, rng);
    let right = grow(tree, data, right_rows, depth + 1, limit, rng);
    tree.nodes[id] = Node::Split { feature, threshold, left, right };
    id
}

fn path_length(tree: &Tree, x: &[f64]) -> f64 {
    let mut node = 0;
    let mut depth = 0.0;
    loop {
        match tree.nodes[node] {
            Node::Split { feature, threshold, left, right } => {
                node = if x[feature] <= threshold { left } else { right };
                depth += 1.0;
            }
            Node::Leaf { size } => return depth + average_path_length(size),
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(3);
        let mut data: Vec<Vec<f64>> = (0..60)
            .map(|_| vec![rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
            .collect();
        data.push(vec![12.0, -12.0]);
        data
    }

    #[test]
    fn c_of_n() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
        assert_eq!(percentile(&v, 50.0), 2.5);
    }

    #[test]
    fn outlier_scores_lowest_and_is_flagged() {
        let data = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, &ForestParams::default(), &mut StdRng::seed_from_u64(42)).unwrap();
        let scores = forest.score_samples(&data).unwrap();
        let min_idx = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(min_idx, data.len() - 1);
        assert!(scores.iter().all(|s| (-1.0..=0.0).contains(s)));
        assert!(forest.predict(&data).unwrap()[data.len() - 1]);
    }

    #[test]
    fn contamination_bounds_flag_rate() {
        let data = cluster_with_outlier();
        let params = ForestParams { contamination: 0.1, ..Default::default() };
        let forest = IsolationForest::fit(&data, &params, &mut StdRng::seed_from_u64(1)).unwrap();
        let flagged = forest.predict(&data).unwrap().into_iter().filter(|&o| o).count();
        assert!(flagged >= 1 && flagged <= 7);
    }

    #[test]
    fn identical_points_give_identical_scores() {
        let data = vec![vec![1.0, 1.0]; 10];
        let forest = IsolationForest::fit(&data, &ForestParams::default(), &mut StdRng::seed_from_u64(1)).unwrap();
        let scores = forest.score_samples(&data).unwrap();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        assert!(forest.predict(&data).unwrap().iter().all(|&o| !o));
    }

    #[test]
    fn rejects_empty_and_ragged_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            IsolationForest::fit(&[], &ForestParams::default(), &mut rng).unwrap_err(),
            DetectionError::EmptyEmbedding
        );
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            IsolationForest::fit(&ragged, &ForestParams::default(), &mut rng),
            Err(DetectionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn same_seed_same_forest_scores() {
        let data = cluster_with_outlier();
        let a = IsolationForest::fit(&data, &ForestParams::default(), &mut StdRng::seed_from_u64(8)).unwrap();
        let b = IsolationForest::fit(&data, &ForestParams::default(), &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.score_samples(&data).unwrap(), b.score_samples(&data).unwrap());
    }
}
