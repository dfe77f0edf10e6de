//! metrics.rs — Offline scoring of detection results against ground truth
//!
//! Positive class = phantom (ground truth `false`). Counts accumulate over
//! every node of every evaluated snapshot.

use std::time::Duration;

use serde::Serialize;

use crate::detection::DetectionResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Confusion {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl Confusion {
    pub fn from_result(result: &DetectionResult) -> Self {
        let mut c = Self::default();
        for (id, &legit) in &result.ground_truth {
            match (result.is_flagged(id), legit) {
                (true, false) => c.true_positives += 1,
                (true, true) => c.false_positives += 1,
                (false, true) => c.true_negatives += 1,
                (false, false) => c.false_negatives += 1,
            }
        }
        c
    }

    pub fn merge(&mut self, other: Confusion) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.true_negatives += other.true_negatives;
        self.false_negatives += other.false_negatives;
    }

    pub fn tpr(&self) -> f64 { ratio(self.true_positives, self.true_positives + self.false_negatives) }
    pub fn fpr(&self) -> f64 { ratio(self.false_positives, self.false_positives + self.true_negatives) }
    pub fn precision(&self) -> f64 { ratio(self.true_positives, self.true_positives + self.false_positives) }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.tpr());
        if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorMetrics {
    pub tpr: f64,
    pub fpr: f64,
    pub precision: f64,
    pub f1: f64,
    /// Mean wall-clock latency per detect call (seconds)
    pub detection_time: f64,
    pub evaluations: usize,
    pub confusion: Confusion,
}

pub fn summarize(results: &[DetectionResult]) -> DetectorMetrics {
    let mut confusion = Confusion::default();
    for r in results {
        confusion.merge(Confusion::from_result(r));
    }
    let total: Duration = results.iter().map(|r| r.detection_time).sum();
    let detection_time = if results.is_empty() { 0.0 } else { total.as_secs_f64() / results.len() as f64 };
    DetectorMetrics {
        tpr: confusion.tpr(),
        fpr: confusion.fpr(),
        precision: confusion.precision(),
        f1: confusion.f1(),
        detection_time,
        evaluations: results.len(),
        confusion,
    }
}
