//! End-to-end phantom attack scenarios through the public API.

use swarm_sim::detection::{AnomalyDetector, EmbeddingConfig, GraphEmbeddingDetector, GraphMetricConfig, GraphMetricDetector};
use swarm_sim::{AttackScenario, CommGraph, InjectorState, PhantomInjector, Swarm, SwarmConfig};

fn swarm_config() -> SwarmConfig {
    SwarmConfig {
        num_uavs: 10,
        comm_range_m: 200.0,
        bounds_m: [500.0, 500.0, 100.0],
        ..Default::default()
    }
}

fn small_embedding() -> EmbeddingConfig {
    EmbeddingConfig {
        embedding_dim: 16,
        walk_length: 10,
        num_walks: 10,
        window: 4,
        epochs: 2,
        n_estimators: 50,
        ..Default::default()
    }
}

/// Steps the swarm to t = 1..=steps with a phantom attack, returning every snapshot.
fn run(seed: u64, scenario: AttackScenario, steps: usize) -> Vec<(InjectorState, CommGraph)> {
    let mut swarm = Swarm::with_seed(&swarm_config(), seed).unwrap();
    let mut injector = PhantomInjector::new(scenario).unwrap();
    (0..steps)
        .map(|_| {
            swarm.advance(1.0).unwrap();
            let t = swarm.simulation_time();
            let state = injector.update(&mut swarm, t).unwrap();
            (state, swarm.snapshot_graph())
        })
        .collect()
}

fn phantoms(graph: &CommGraph) -> usize {
    graph.nodes().filter(|n| n.is_legitimate == Some(false)).count()
}

#[test]
fn phantoms_appear_and_vanish_with_the_attack_window() {
    let snaps = run(42, AttackScenario::phantom(5.0, 3.0, 3).unwrap(), 10);
    for (i, (state, g)) in snaps.iter().enumerate() {
        let t = (i + 1) as f64;
        let (expect_state, expect_phantoms) = match t {
            t if t < 5.0 => (InjectorState::Inactive, 0),
            t if t < 8.0 => (InjectorState::Active, 3),
            _ => (InjectorState::Removed, 0),
        };
        assert_eq!(*state, expect_state, "t={t}");
        assert_eq!(phantoms(g), expect_phantoms, "t={t}");
        assert_eq!(g.node_count(), 10 + expect_phantoms, "t={t}");
    }
    // t = 6: 13 nodes, exactly three labelled false
    let (_, g6) = &snaps[5];
    assert_eq!(g6.node_count(), 13);
    assert_eq!(g6.nodes().filter(|n| !g6.ground_truth(&n.uav_id)).count(), 3);
}

#[test]
fn same_seed_same_world() {
    let a = run(42, AttackScenario::phantom(5.0, 3.0, 3).unwrap(), 8);
    let b = run(42, AttackScenario::phantom(5.0, 3.0, 3).unwrap(), 8);
    for ((_, ga), (_, gb)) in a.iter().zip(&b) {
        assert_eq!(ga.edge_set(), gb.edge_set());
        let pa: Vec<_> = ga.nodes().map(|n| (n.uav_id.clone(), n.position)).collect();
        let pb: Vec<_> = gb.nodes().map(|n| (n.uav_id.clone(), n.position)).collect();
        assert_eq!(pa, pb);
    }
}

#[test]
fn zero_phantoms_leaves_every_label_true() {
    let snaps = run(42, AttackScenario::phantom(2.0, 5.0, 0).unwrap(), 6);
    for (_, g) in &snaps {
        assert_eq!(g.node_count(), 10);
        assert!(g.nodes().all(|n| g.ground_truth(&n.uav_id)));
    }
}

#[test]
fn zero_phantom_injector_leaves_scores_unchanged() {
    let with_injector: Vec<CommGraph> =
        run(42, AttackScenario::phantom(2.0, 5.0, 0).unwrap(), 6).into_iter().map(|(_, g)| g).collect();

    let mut swarm = Swarm::with_seed(&swarm_config(), 42).unwrap();
    let without_injector: Vec<CommGraph> = (0..6)
        .map(|_| {
            swarm.advance(1.0).unwrap();
            swarm.snapshot_graph()
        })
        .collect();

    let score = |snaps: &[CommGraph]| {
        let mut det = GraphEmbeddingDetector::new(small_embedding(), 42).unwrap();
        det.train(&snaps[..4]);
        assert!(det.is_trained());
        det.detect(&snaps[5])
    };
    let a = score(&with_injector);
    let b = score(&without_injector);
    assert_eq!(a.confidence_scores.len(), 10);
    assert_eq!(a.confidence_scores, b.confidence_scores);
    assert_eq!(a.anomalous_uav_ids, b.anomalous_uav_ids);
    assert_eq!(a.ground_truth, b.ground_truth);
}

#[test]
fn embedding_detector_scores_attacked_snapshot() {
    let snaps = run(42, AttackScenario::phantom(5.0, 3.0, 3).unwrap(), 6);
    let clean: Vec<CommGraph> = snaps[..4].iter().map(|(_, g)| g.clone()).collect();
    let attacked = &snaps[5].1;

    let mut det = GraphEmbeddingDetector::new(small_embedding(), 42).unwrap();
    det.train(&clean);
    assert!(det.is_trained());

    let r = det.detect(attacked);
    assert_eq!(r.confidence_scores.len(), 13);
    assert_eq!(r.ground_truth.len(), 13);
    assert_eq!(r.ground_truth.values().filter(|legit| !**legit).count(), 3);
    assert!(r.confidence_scores.values().all(|c| (0.0..=1.0).contains(c)));
    assert!(r.anomalous_uav_ids.iter().all(|id| r.confidence_scores.contains_key(id)));

    let again = det.detect(attacked);
    assert_eq!(r.confidence_scores, again.confidence_scores);
    assert_eq!(r.anomalous_uav_ids, again.anomalous_uav_ids);
}

#[test]
fn detectors_degrade_on_degenerate_input() {
    let empty = CommGraph::new(0.0);
    let snaps = run(1, AttackScenario::phantom(50.0, 1.0, 0).unwrap(), 3);
    let clean: Vec<CommGraph> = snaps.into_iter().map(|(_, g)| g).collect();

    let mut untrained = GraphEmbeddingDetector::new(small_embedding(), 42).unwrap();
    assert!(untrained.detect(&clean[0]).is_empty());
    untrained.train(&[]);
    assert!(!untrained.is_trained());

    let mut det = GraphEmbeddingDetector::new(small_embedding(), 42).unwrap();
    det.train(&clean);
    let r = det.detect(&empty);
    assert!(r.is_empty());
    assert!(r.ground_truth.is_empty());

    let mut metrics = GraphMetricDetector::new(GraphMetricConfig::default()).unwrap();
    metrics.train(&clean);
    assert!(metrics.detect(&empty).is_empty());
    let r = metrics.detect(&clean[2]);
    assert_eq!(r.confidence_scores.len(), 10);
}
