//! Combined over/under resampling: synthetic minority oversampling followed
//! by edited-nearest-neighbour cleanup.
//!
//! Deterministic under a fixed seed: synthetic points are interpolated with a
//! seeded generator and the cleanup pass is purely data-driven.

use crate::error::PipelineError;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SMOTE-then-ENN resampler targeting the minority class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoteEnn {
    /// Minority neighbours considered when interpolating a synthetic point.
    pub k_neighbors: usize,
    /// Neighbours consulted by the cleanup pass; a sample survives only if
    /// all of them share its label.
    pub enn_neighbors: usize,
    pub seed: u64,
}

impl SmoteEnn {
    pub fn new(k_neighbors: usize, enn_neighbors: usize, seed: u64) -> Self {
        Self {
            k_neighbors,
            enn_neighbors,
            seed,
        }
    }

    /// Oversample the minority class to parity with the majority class, then
    /// drop every sample whose neighbourhood disagrees with its label.
    pub fn fit_resample(
        &self,
        features: &Array2<f64>,
        target: &[f64],
    ) -> Result<(Array2<f64>, Vec<f64>), PipelineError> {
        if features.nrows() != target.len() {
            return Err(PipelineError::transform(format!(
                "resample: {} feature rows but {} labels",
                features.nrows(),
                target.len()
            )));
        }
        if target.is_empty() {
            return Err(PipelineError::transform("resample: empty input"));
        }

        let (oversampled, labels) = self.oversample(features, target);
        Ok(self.clean(oversampled, labels))
    }

    fn oversample(&self, features: &Array2<f64>, target: &[f64]) -> (Array2<f64>, Vec<f64>) {
        let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
        for &label in target {
            counts.entry(label.to_bits()).or_insert((label, 0)).1 += 1;
        }

        let max_count = counts.values().map(|(_, n)| *n).max().unwrap_or(0);
        let (minority, minority_count) = counts
            .values()
            .min_by_key(|(_, n)| *n)
            .map(|(l, n)| (*l, *n))
            .unwrap_or((0.0, 0));

        let minority_rows: Vec<usize> = (0..target.len())
            .filter(|&i| target[i] == minority)
            .collect();

        let deficit = max_count.saturating_sub(minority_count);
        if deficit == 0 || minority_rows.len() < 2 {
            if deficit > 0 {
                tracing::warn!(
                    minority_count,
                    "Too few minority samples to synthesize from; skipping oversampling"
                );
            }
            return (features.clone(), target.to_vec());
        }

        let k = self.k_neighbors.min(minority_rows.len() - 1).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic: Vec<Vec<f64>> = Vec::with_capacity(deficit);

        for _ in 0..deficit {
            let base = minority_rows[rng.gen_range(0..minority_rows.len())];
            let neighbors = nearest_within(features, base, &minority_rows, k);
            let pick = neighbors[rng.gen_range(0..neighbors.len())];
            let gap: f64 = rng.r#gen();

            let row: Vec<f64> = features
                .row(base)
                .iter()
                .zip(features.row(pick).iter())
                .map(|(a, b)| a + gap * (b - a))
                .collect();
            synthetic.push(row);
        }

        let cols = features.ncols();
        let mut data = Array2::<f64>::zeros((target.len() + synthetic.len(), cols));
        for (i, row) in features.rows().into_iter().enumerate() {
            data.row_mut(i).assign(&row);
        }
        for (i, row) in synthetic.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                data[[target.len() + i, j]] = *v;
            }
        }

        let mut labels = target.to_vec();
        labels.extend(std::iter::repeat(minority).take(synthetic.len()));
        (data, labels)
    }

    fn clean(&self, features: Array2<f64>, labels: Vec<f64>) -> (Array2<f64>, Vec<f64>) {
        let n = labels.len();
        if n <= self.enn_neighbors + 1 || self.enn_neighbors == 0 {
            return (features, labels);
        }

        let all: Vec<usize> = (0..n).collect();
        let keep: Vec<usize> = (0..n)
            .filter(|&i| {
                let neighbors = nearest_within(&features, i, &all, self.enn_neighbors);
                neighbors.iter().all(|&j| labels[j] == labels[i])
            })
            .collect();

        if keep.len() == n {
            return (features, labels);
        }
        tracing::debug!(removed = n - keep.len(), "Neighbourhood cleanup dropped samples");

        let mut data = Array2::<f64>::zeros((keep.len(), features.ncols()));
        for (out, &i) in keep.iter().enumerate() {
            data.row_mut(out).assign(&features.row(i));
        }
        let kept_labels = keep.iter().map(|&i| labels[i]).collect();
        (data, kept_labels)
    }
}

/// Indices of the `k` candidates nearest to `row` (excluding itself),
/// by Euclidean distance, ties broken by index for determinism.
fn nearest_within(
    features: &Array2<f64>,
    row: usize,
    candidates: &[usize],
    k: usize,
) -> Vec<usize> {
    let anchor = features.row(row);
    let mut scored: Vec<(f64, usize)> = candidates
        .iter()
        .filter(|&&c| c != row)
        .map(|&c| (squared_distance(anchor, features.row(c)), c))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.truncate(k);
    scored.into_iter().map(|(_, c)| c).collect()
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
