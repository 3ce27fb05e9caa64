//! Classification metrics with class-frequency weighting.

use serde::{Deserialize, Serialize};

/// Held-out metrics for a classifier. Precision, recall and F1 are averaged
/// across classes weighted by class frequency in the truth labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Fraction of predictions that match the truth labels.
pub fn accuracy(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(pred)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Weighted F1 only; what the evaluation stage scores models on.
pub fn weighted_f1(truth: &[f64], pred: &[f64]) -> f64 {
    classification_report(truth, pred).f1
}

/// Full weighted report over the observed classes.
pub fn classification_report(truth: &[f64], pred: &[f64]) -> ClassificationReport {
    let total = truth.len();
    if total == 0 {
        return ClassificationReport {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }

    let mut classes: Vec<f64> = truth.iter().chain(pred).copied().collect();
    classes.sort_by(f64::total_cmp);
    classes.dedup();

    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1 = 0.0;
    for &class in &classes {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        let mut support = 0usize;
        for (&t, &p) in truth.iter().zip(pred) {
            if t == class {
                support += 1;
                if p == class {
                    tp += 1;
                } else {
                    fn_ += 1;
                }
            } else if p == class {
                fp += 1;
            }
        }
        let p = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let r = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        let weight = support as f64 / total as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    ClassificationReport {
        accuracy: accuracy(truth, pred),
        precision,
        recall,
        f1,
    }
}
