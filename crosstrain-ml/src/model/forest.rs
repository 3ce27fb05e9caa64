//! Random forest classifier: bagged CART trees with majority voting.

use crate::error::PipelineError;
use crate::model::tree::{DecisionTree, SplitCriterion, TreeParams, distinct_labels};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub criterion: SplitCriterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

/// A fitted, serializable forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    classes: Vec<f64>,
}

impl RandomForestClassifier {
    /// Fit on a feature matrix and labels. Each tree sees a bootstrap sample
    /// drawn with a per-tree seed derived from the base seed, so fits are
    /// reproducible.
    pub fn fit(
        x: &Array2<f64>,
        y: &[f64],
        params: &ForestParams,
    ) -> Result<Self, PipelineError> {
        let n = y.len();
        if n == 0 || x.nrows() != n {
            return Err(PipelineError::training(format!(
                "fit: {} feature rows for {} labels",
                x.nrows(),
                n
            )));
        }

        let tree_params = TreeParams {
            criterion: params.criterion,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        };

        let mut trees = Vec::with_capacity(params.n_estimators);
        for t in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));

            let mut bx = Array2::<f64>::zeros((n, x.ncols()));
            let mut by = vec![0.0; n];
            for i in 0..n {
                let pick = rng.gen_range(0..n);
                bx.row_mut(i).assign(&x.row(pick));
                by[i] = y[pick];
            }

            trees.push(DecisionTree::fit(&bx, &by, &tree_params, &mut rng));
        }

        Ok(Self {
            trees,
            classes: distinct_labels(y),
        })
    }

    /// Majority vote across trees, ties broken toward the smaller label.
    pub fn predict(&self, x: ArrayView2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let mut votes = vec![0usize; self.classes.len()];
                for tree in &self.trees {
                    let label = tree.predict_row(row);
                    if let Some(idx) = self
                        .classes
                        .iter()
                        .position(|c| c.to_bits() == label.to_bits())
                    {
                        votes[idx] += 1;
                    }
                }
                let best = votes
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                self.classes[best]
            })
            .collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }
}
