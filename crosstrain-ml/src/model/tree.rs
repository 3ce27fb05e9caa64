//! CART decision tree used as the forest's base learner.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Impurity criterion for split selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

impl SplitCriterion {
    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        match self {
            Self::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / total as f64;
                        p * p
                    })
                    .sum::<f64>()
            }
            Self::Entropy => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / total as f64;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

/// Growth limits shared by every tree in a forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub criterion: SplitCriterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        label: f64,
    },
}

/// A fitted tree: node arena with the root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Grow a tree on `x`/`y`. Each node considers a random √d feature
    /// subset drawn from `rng`.
    pub fn fit(x: &Array2<f64>, y: &[f64], params: &TreeParams, rng: &mut StdRng) -> Self {
        let classes = distinct_labels(y);
        let class_index: BTreeMap<u64, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, l)| (l.to_bits(), i))
            .collect();

        let mut builder = TreeBuilder {
            x,
            y,
            params,
            classes: &classes,
            class_index: &class_index,
            nodes: Vec::new(),
        };
        let indices: Vec<usize> = (0..y.len()).collect();
        builder.grow(&indices, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                TreeNode::Leaf { label } => return *label,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    classes: &'a [f64],
    class_index: &'a BTreeMap<u64, usize>,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `indices`; returns its node id.
    fn grow(&mut self, indices: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.count(indices);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_capped = self.params.max_depth.is_some_and(|d| depth >= d);

        if pure || depth_capped || indices.len() < self.params.min_samples_split {
            return self.leaf(&counts);
        }

        let Some((feature, threshold)) = self.best_split(indices, &counts, rng) else {
            return self.leaf(&counts);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[[i, feature]] <= threshold);

        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { label: 0.0 }); // placeholder until children exist
        let left = self.grow(&left_idx, depth + 1, rng);
        let right = self.grow(&right_idx, depth + 1, rng);
        self.nodes[node] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        node
    }

    fn leaf(&mut self, counts: &[usize]) -> usize {
        let best = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.nodes.push(TreeNode::Leaf {
            label: self.classes[best],
        });
        self.nodes.len() - 1
    }

    fn count(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &i in indices {
            counts[self.class_index[&self.y[i].to_bits()]] += 1;
        }
        counts
    }

    /// Exhaustive midpoint search over a random feature subset. Returns the
    /// split with the largest impurity decrease that leaves both children at
    /// least `min_samples_leaf` big.
    fn best_split(
        &self,
        indices: &[usize],
        parent_counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let d = self.x.ncols();
        let subset_size = ((d as f64).sqrt().round() as usize).clamp(1, d);
        let features = rand::seq::index::sample(rng, d, subset_size);

        let parent_impurity = self.params.criterion.impurity(parent_counts, n);
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<(f64, usize, f64)> = None;

        for feature in features {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_counts = vec![0usize; self.classes.len()];
            for split_at in 1..n {
                let prev = order[split_at - 1];
                left_counts[self.class_index[&self.y[prev].to_bits()]] += 1;

                let lo = self.x[[prev, feature]];
                let hi = self.x[[order[split_at], feature]];
                if lo == hi {
                    continue;
                }
                if split_at < min_leaf || n - split_at < min_leaf {
                    continue;
                }

                let right_counts: Vec<usize> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();
                let left_imp = self.params.criterion.impurity(&left_counts, split_at);
                let right_imp = self.params.criterion.impurity(&right_counts, n - split_at);
                let weighted = (split_at as f64 * left_imp + (n - split_at) as f64 * right_imp)
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 0.0 && best.map_or(true, |(g, _, _)| gain > g) {
                    best = Some((gain, feature, (lo + hi) / 2.0));
                }
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }
}

/// Sorted distinct labels.
pub(crate) fn distinct_labels(y: &[f64]) -> Vec<f64> {
    let mut labels: Vec<f64> = y.to_vec();
    labels.sort_by(f64::total_cmp);
    labels.dedup();
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            criterion: SplitCriterion::Gini,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    fn separable() -> (Array2<f64>, Vec<f64>) {
        let x = array![
            [0.0, 1.0],
            [0.2, 0.8],
            [0.4, 0.3],
            [5.0, 1.2],
            [5.2, 0.7],
            [5.4, 0.1],
        ];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, &params(), &mut rng);
        for (row, &label) in x.rows().into_iter().zip(&y) {
            assert_eq!(tree.predict_row(row), label);
        }
    }

    #[test]
    fn test_entropy_criterion_also_separates() {
        let (x, y) = separable();
        let mut rng = StdRng::seed_from_u64(3);
        let p = TreeParams {
            criterion: SplitCriterion::Entropy,
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, &p, &mut rng);
        assert_eq!(tree.predict_row(x.row(0)), 0.0);
        assert_eq!(tree.predict_row(x.row(5)), 1.0);
    }

    #[test]
    fn test_min_samples_leaf_collapses_to_leaf() {
        let (x, y) = separable();
        let mut rng = StdRng::seed_from_u64(0);
        let p = TreeParams {
            min_samples_leaf: 4,
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, &p, &mut rng);
        // No split can give both children 4 samples out of 6.
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_max_depth_zero_is_majority_vote() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = vec![1.0, 1.0, 0.0];
        let mut rng = StdRng::seed_from_u64(0);
        let p = TreeParams {
            max_depth: Some(0),
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, &p, &mut rng);
        assert_eq!(tree.predict_row(x.row(2)), 1.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let (x, y) = separable();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, &params(), &mut rng);
        let json = serde_json::to_string(&tree).unwrap();
        let back: DecisionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict_row(x.row(0)), tree.predict_row(x.row(0)));
    }

    #[test]
    fn test_impurity_values() {
        assert_eq!(SplitCriterion::Gini.impurity(&[2, 2], 4), 0.5);
        assert_eq!(SplitCriterion::Entropy.impurity(&[2, 2], 4), 1.0);
        assert_eq!(SplitCriterion::Gini.impurity(&[4, 0], 4), 0.0);
    }
}
