//! skipgram.rs — Skip-gram embeddings with negative sampling
//!
//! Walks are sentences, node positions are tokens. For each token and each
//! context token inside a randomly shrunk window, the context vector is
//! trained to predict the centre token against `negative` noise tokens drawn
//! from the unigram distribution raised to 0.75. Learning rate decays
//! linearly over all epochs.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::DetectionError;

const NOISE_EXPONENT: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkipGramParams {
    pub dimensions: usize,
    pub window: usize,
    pub negative: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub min_learning_rate: f64,
}

/// Train one vector per token in `0..vocab_size`.
/// Tokens that never occur keep their random initial vector.
pub fn train_embeddings(
    walks: &[Vec<usize>],
    vocab_size: usize,
    params: &SkipGramParams,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f64>>, DetectionError> {
    if vocab_size == 0 || params.dimensions == 0 {
        return Err(DetectionError::EmptyEmbedding);
    }
    let dim = params.dimensions;

    let mut counts = vec![0usize; vocab_size];
    for &tok in walks.iter().flatten() {
        counts[tok] += 1;
    }
    let corpus_len: usize = counts.iter().sum();
    let noise = WeightedIndex::new(counts.iter().map(|&c| (c as f64).powf(NOISE_EXPONENT))).ok();

    // input vectors: small uniform init; output vectors: zeros
    let mut syn0: Vec<f64> = (0..vocab_size * dim)
        .map(|_| (rng.gen::<f64>() - 0.5) / dim as f64)
        .collect();
    let mut syn1 = vec![0.0f64; vocab_size * dim];
    let mut grad = vec![0.0f64; dim];

    let total = (params.epochs * corpus_len).max(1) as f64;
    let mut processed = 0usize;

    for _ in 0..params.epochs {
        for walk in walks {
            for (pos, &centre) in walk.iter().enumerate() {
                let alpha = (params.learning_rate
                    - (params.learning_rate - params.min_learning_rate) * processed as f64 / total)
                    .max(params.min_learning_rate);
                processed += 1;

                // dynamic window: span uniform in 1..=window
                let span = if params.window == 0 { 0 } else { params.window - rng.gen_range(0..params.window) };
                let lo = pos.saturating_sub(span);
                let hi = (pos + span).min(walk.len() - 1);
                for (ctx_pos, &context) in walk.iter().enumerate().take(hi + 1).skip(lo) {
                    if ctx_pos == pos {
                        continue;
                    }
                    train_pair(&mut syn0, &mut syn1, &mut grad, context, centre, alpha, params, noise.as_ref(), rng);
                }
            }
        }
    }

    let vectors: Vec<Vec<f64>> = syn0.chunks(dim).map(<[f64]>::to_vec).collect();
    if vectors.iter().flatten().any(|v| !v.is_finite()) {
        return Err(DetectionError::EmptyEmbedding);
    }
    Ok(vectors)
}

#[allow(clippy::too_many_arguments)]
fn train_pair(
    syn0: &mut [f64],
    syn1: &mut [f64],
    grad: &mut [f64],
    input: usize,
    target: usize,
    alpha: f64,
    params: &SkipGramParams,
    noise: Option<&WeightedIndex<f64>>,
    rng: &mut StdRng,
) {
    let dim = params.dimensions;
    grad.iter_mut().for_each(|g| *g = 0.0);
    let l1 = input * dim;

    for d in 0..=params.negative {
        let (out, label) = if d == 0 {
            (target, 1.0)
        } else {
            let Some(noise) = noise else { break };
            let sample = noise.sample(rng);
            if sample == target {
                continue;
            }
            (sample, 0.0)
        };
        let l2 = out * dim;
        let f: f64 = (0..dim).map(|k| syn0[l1 + k] * syn1[l2 + k]).sum();
        let g = (label - sigmoid(f)) * alpha;
        for k in 0..dim {
            grad[k] += g * syn1[l2 + k];
            syn1[l2 + k] += g * syn0[l1 + k];
        }
    }
    for k in 0..dim {
        syn0[l1 + k] += grad[k];
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-30.0, 30.0)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> SkipGramParams {
        SkipGramParams {
            dimensions: 8,
            window: 3,
            negative: 3,
            epochs: 3,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
        }
    }

    fn cosine(a: &[f64], b: &[f64]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn one_vector_per_token() {
        let walks = vec![vec![0, 1, 2, 1, 0], vec![2, 1, 0]];
        let v = train_embeddings(&walks, 4, &params(), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|x| x.len() == 8));
    }

    #[test]
    fn deterministic_under_seed() {
        let walks = vec![vec![0, 1, 2, 3], vec![3, 2, 1, 0]];
        let a = train_embeddings(&walks, 4, &params(), &mut StdRng::seed_from_u64(5)).unwrap();
        let b = train_embeddings(&walks, 4, &params(), &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_vocab_is_an_error() {
        let r = train_embeddings(&[], 0, &params(), &mut StdRng::seed_from_u64(1));
        assert_eq!(r.unwrap_err(), DetectionError::EmptyEmbedding);
    }

    #[test]
    fn co_occurring_tokens_end_up_closer() {
        // two disjoint communities {0,1,2} and {3,4,5}
        let mut walks = Vec::new();
        for i in 0..60 {
            walks.push((0..10).map(|k| (i + k) % 3).collect::<Vec<_>>());
            walks.push((0..10).map(|k| 3 + (i + k) % 3).collect::<Vec<_>>());
        }
        let p = SkipGramParams { dimensions: 16, epochs: 10, ..params() };
        let v = train_embeddings(&walks, 6, &p, &mut StdRng::seed_from_u64(11)).unwrap();
        assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[4]));
    }
}
