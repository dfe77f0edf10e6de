//! walks.rs — Second-order biased random walks (node2vec scheme)
//!
//! From current node `v`, having arrived from `t`, the unnormalised weight of
//! stepping to neighbour `x` is:
//!   1/p  if x == t            (return)
//!   1    if x is adjacent to t (stay local)
//!   1/q  otherwise            (explore)
//! The first step of a walk is uniform over neighbours. A node without
//! neighbours produces a walk of length one.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    pub walk_length: usize,
    pub num_walks: usize,
    /// Return parameter
    pub p: f64,
    /// In-out parameter
    pub q: f64,
}

/// `num_walks` rounds; each round visits every node once, in shuffled order.
/// `adj` holds sorted positional neighbour lists.
pub fn generate_walks(adj: &[Vec<usize>], params: &WalkParams, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..adj.len()).collect();
    let mut walks = Vec::with_capacity(adj.len() * params.num_walks);
    for _ in 0..params.num_walks {
        order.shuffle(rng);
        for &start in &order {
            walks.push(walk_from(adj, start, params, rng));
        }
    }
    walks
}

fn walk_from(adj: &[Vec<usize>], start: usize, params: &WalkParams, rng: &mut StdRng) -> Vec<usize> {
    let mut walk = Vec::with_capacity(params.walk_length);
    walk.push(start);

    while walk.len() < params.walk_length {
        let cur = walk[walk.len() - 1];
        let nbrs = &adj[cur];
        if nbrs.is_empty() {
            break;
        }
        let next = if walk.len() == 1 {
            nbrs[rng.gen_range(0..nbrs.len())]
        } else {
            let prev = walk[walk.len() - 2];
            let weights = nbrs.iter().map(|&x| transition_weight(adj, prev, x, params));
            match WeightedIndex::new(weights) {
                Ok(dist) => nbrs[dist.sample(rng)],
                Err(_) => break,
            }
        };
        walk.push(next);
    }
    walk
}

fn transition_weight(adj: &[Vec<usize>], prev: usize, next: usize, params: &WalkParams) -> f64 {
    if next == prev {
        1.0 / params.p
    } else if adj[prev].binary_search(&next).is_ok() {
        1.0
    } else {
        1.0 / params.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(p: f64, q: f64) -> WalkParams {
        WalkParams { walk_length: 8, num_walks: 3, p, q }
    }

    fn path_graph(n: usize) -> Vec<Vec<usize>> {
        (0..n)
            .map(|i| {
                let mut nb = Vec::new();
                if i > 0 { nb.push(i - 1); }
                if i + 1 < n { nb.push(i + 1); }
                nb
            })
            .collect()
    }

    #[test]
    fn walk_count_and_validity() {
        let adj = path_graph(5);
        let walks = generate_walks(&adj, &params(1.0, 1.0), &mut StdRng::seed_from_u64(1));
        assert_eq!(walks.len(), 15);
        for w in &walks {
            assert_eq!(w.len(), 8);
            for pair in w.windows(2) {
                assert!(adj[pair[0]].contains(&pair[1]));
            }
        }
        // every node starts exactly num_walks walks
        for v in 0..5 {
            assert_eq!(walks.iter().filter(|w| w[0] == v).count(), 3);
        }
    }

    #[test]
    fn isolated_node_walk_is_single_token() {
        let adj = vec![vec![], vec![2], vec![1]];
        let walks = generate_walks(&adj, &params(1.0, 1.0), &mut StdRng::seed_from_u64(2));
        assert!(walks.iter().filter(|w| w[0] == 0).all(|w| w == &vec![0]));
    }

    #[test]
    fn walks_are_reproducible() {
        let adj = path_graph(6);
        let a = generate_walks(&adj, &params(0.5, 2.0), &mut StdRng::seed_from_u64(9));
        let b = generate_walks(&adj, &params(0.5, 2.0), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn bias_weights() {
        // triangle 0-1-2 with pendant 3 on node 1
        let adj = vec![vec![1, 2], vec![0, 2, 3], vec![0, 1], vec![1]];
        let p = params(0.5, 4.0);
        // arrived at 1 from 0
        assert_eq!(transition_weight(&adj, 0, 0, &p), 2.0);
        assert_eq!(transition_weight(&adj, 0, 2, &p), 1.0);
        assert_eq!(transition_weight(&adj, 0, 3, &p), 0.25);
    }

    #[test]
    fn tiny_p_forces_backtracking() {
        let adj = path_graph(4);
        let p = WalkParams { walk_length: 6, num_walks: 4, p: 1e-9, q: 1.0 };
        let walks = generate_walks(&adj, &p, &mut StdRng::seed_from_u64(3));
        for w in walks {
            for i in 2..w.len() {
                assert_eq!(w[i], w[i - 2]);
            }
        }
    }
}
