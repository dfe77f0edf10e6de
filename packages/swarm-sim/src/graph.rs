//! graph.rs — Communication graph snapshot
//!
//! Derived fresh from current UAV positions at every step:
//! 1. One node per UAV, in identity order
//! 2. Undirected edge iff the pair is within radio range under the link policy
//! 3. Each node carries the UAV's position and ground-truth label for offline scoring
//!
//! A snapshot is never patched. Consumers treat it as read-only.
//! O(n²) pairwise distances; fine for tens to low hundreds of UAVs.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use remote_id_types::Vec3;

use crate::uav::Uav;

// ── Link policy ───────────────────────────────────────────────────────────────

/// Which of the two communication ranges decides whether a pair is linked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Both ends must hear each other
    #[default]
    MinRange,
    /// Either end hearing the other is enough
    MaxRange,
}

impl LinkPolicy {
    pub fn threshold(self, a: f64, b: f64) -> f64 {
        match self {
            LinkPolicy::MinRange => a.min(b),
            LinkPolicy::MaxRange => a.max(b),
        }
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────────────

/// Node attributes: a read-only view of the UAV at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommNode {
    pub uav_id: String,
    pub position: Vec3,
    /// Ground truth; `None` for nodes not backed by a simulated UAV
    pub is_legitimate: Option<bool>,
}

impl CommNode {
    pub fn from_uav(uav: &Uav) -> Self {
        Self {
            uav_id: uav.id().to_string(),
            position: uav.position(),
            is_legitimate: Some(uav.is_legitimate()),
        }
    }

    /// Node without a UAV behind it (hand-built graphs, external feeds)
    pub fn unlabeled(uav_id: impl Into<String>) -> Self {
        Self { uav_id: uav_id.into(), position: Vec3::zero(), is_legitimate: None }
    }
}

// ── Graph ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CommGraph {
    graph: UnGraph<CommNode, f64>,
    index: BTreeMap<String, NodeIndex>,
    /// Simulation time the snapshot was taken at
    timestamp: f64,
}

impl CommGraph {
    pub fn new(timestamp: f64) -> Self {
        Self { timestamp, ..Default::default() }
    }

    /// Pairwise-range construction over `uavs`, in iteration order.
    pub fn build<'a>(uavs: impl IntoIterator<Item = &'a Uav>, policy: LinkPolicy, timestamp: f64) -> Self {
        let uavs: Vec<&Uav> = uavs.into_iter().collect();
        let mut g = Self::new(timestamp);
        let idx: Vec<NodeIndex> = uavs.iter().map(|u| g.add_node(CommNode::from_uav(u))).collect();

        for i in 0..uavs.len() {
            for j in (i + 1)..uavs.len() {
                let d = uavs[i].position().dist(&uavs[j].position());
                if d <= policy.threshold(uavs[i].comm_range(), uavs[j].comm_range()) {
                    g.graph.add_edge(idx[i], idx[j], d);
                }
            }
        }
        g
    }

    /// Insert a node. An existing id keeps its node and gets its attributes replaced.
    pub fn add_node(&mut self, node: CommNode) -> NodeIndex {
        if let Some(&i) = self.index.get(&node.uav_id) {
            self.graph[i] = node;
            return i;
        }
        let id = node.uav_id.clone();
        let i = self.graph.add_node(node);
        self.index.insert(id, i);
        i
    }

    /// Link two existing nodes. Returns false for unknown ids, self-loops or duplicates.
    pub fn add_edge(&mut self, a: &str, b: &str, distance: f64) -> bool {
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        if ia == ib || self.graph.contains_edge(ia, ib) {
            return false;
        }
        self.graph.add_edge(ia, ib, distance);
        true
    }

    pub fn timestamp(&self) -> f64 { self.timestamp }
    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }
    pub fn is_empty(&self) -> bool { self.graph.node_count() == 0 }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &CommNode> {
        self.graph.node_indices().map(move |i| &self.graph[i])
    }

    pub fn node(&self, uav_id: &str) -> Option<&CommNode> {
        self.index.get(uav_id).map(|&i| &self.graph[i])
    }

    pub fn contains(&self, uav_id: &str) -> bool { self.index.contains_key(uav_id) }

    /// Ground-truth label, failing safe toward legitimate for unlabeled nodes
    pub fn ground_truth(&self, uav_id: &str) -> bool {
        self.node(uav_id).and_then(|n| n.is_legitimate).unwrap_or(true)
    }

    /// Sorted neighbor ids of `uav_id`
    pub fn neighbors(&self, uav_id: &str) -> Vec<&str> {
        let Some(&i) = self.index.get(uav_id) else { return Vec::new() };
        let mut out: Vec<&str> = self.graph.neighbors(i).map(|n| self.graph[n].uav_id.as_str()).collect();
        out.sort_unstable();
        out
    }

    /// Edge set with each pair ordered lexicographically
    pub fn edge_set(&self) -> BTreeSet<(String, String)> {
        self.graph
            .edge_references()
            .map(|e| {
                let a = self.graph[e.source()].uav_id.clone();
                let b = self.graph[e.target()].uav_id.clone();
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect()
    }

    /// Adjacency as positional indices (node order), each list sorted ascending.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        self.graph
            .node_indices()
            .map(|i| {
                let mut nb: Vec<usize> = self.graph.neighbors(i).map(|n| n.index()).collect();
                nb.sort_unstable();
                nb.dedup();
                nb
            })
            .collect()
    }
}

/// Local clustering coefficient per node (positional order), from sorted adjacency.
pub fn clustering_coefficients(adj: &[Vec<usize>]) -> Vec<f64> {
    adj.iter()
        .map(|nb| {
            let k = nb.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (a_pos, &a) in nb.iter().enumerate() {
                for &b in &nb[a_pos + 1..] {
                    if adj[a].binary_search(&b).is_ok() {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uav(id: &str, x: f64, range: f64) -> Uav {
        Uav::new(id, Vec3::new(x, 0.0, 0.0), Vec3::zero(), range).unwrap()
    }

    #[test]
    fn edges_follow_min_range() {
        let uavs = [uav("A", 0.0, 100.0), uav("B", 80.0, 50.0), uav("C", 120.0, 100.0)];
        let g = CommGraph::build(uavs.iter(), LinkPolicy::MinRange, 0.0);
        assert_eq!(g.node_count(), 3);
        // A-B 80m > min(100, 50); B-C 40m ok; A-C 120m too far
        assert_eq!(g.edge_set(), BTreeSet::from([("B".to_string(), "C".to_string())]));
    }

    #[test]
    fn edges_follow_max_range() {
        let uavs = [uav("A", 0.0, 100.0), uav("B", 80.0, 50.0)];
        let g = CommGraph::build(uavs.iter(), LinkPolicy::MaxRange, 0.0);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.neighbors("A"), vec!["B"]);
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let uavs = [uav("A", 0.0, 50.0), uav("B", 50.0, 50.0)];
        let g = CommGraph::build(uavs.iter(), LinkPolicy::MinRange, 0.0);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn empty_input_gives_empty_graph() {
        let g = CommGraph::build(std::iter::empty(), LinkPolicy::MinRange, 3.0);
        assert!(g.is_empty());
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.timestamp(), 3.0);
    }

    #[test]
    fn unlabeled_nodes_default_to_legitimate() {
        let mut g = CommGraph::new(0.0);
        g.add_node(CommNode::unlabeled("X"));
        let p = Uav::phantom("P", Vec3::zero(), Vec3::zero(), 1.0).unwrap();
        g.add_node(CommNode::from_uav(&p));
        assert!(g.ground_truth("X"));
        assert!(!g.ground_truth("P"));
    }

    #[test]
    fn add_edge_rejects_duplicates_and_unknowns() {
        let mut g = CommGraph::new(0.0);
        g.add_node(CommNode::unlabeled("A"));
        g.add_node(CommNode::unlabeled("B"));
        assert!(g.add_edge("A", "B", 1.0));
        assert!(!g.add_edge("B", "A", 1.0));
        assert!(!g.add_edge("A", "A", 0.0));
        assert!(!g.add_edge("A", "Z", 1.0));
        assert_eq!(g.adjacency(), vec![vec![1], vec![0]]);
    }

    #[test]
    fn clustering_of_triangle_and_star() {
        // triangle 0-1-2 plus pendant 3 on node 0
        let adj = vec![vec![1, 2, 3], vec![0, 2], vec![0, 1], vec![0]];
        let cc = clustering_coefficients(&adj);
        assert!((cc[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(cc[1], 1.0);
        assert_eq!(cc[3], 0.0);
    }
}
