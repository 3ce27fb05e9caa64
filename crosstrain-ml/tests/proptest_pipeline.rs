//! Property-based tests for the pipeline's algebraic guarantees.

use proptest::prelude::*;

use crosstrain_ml::data::frame::{Dataset, NumericFrame};
use crosstrain_ml::model::preprocess::ColumnPreprocessor;
use crosstrain_ml::stages::evaluation::acceptance;
use crosstrain_ml::stages::ingestion::split_train_test;
use ndarray::Array2;
use serde_json::json;

fn dataset(n: usize) -> Dataset {
    let rows = (0..n).map(|i| vec![json!(i as i64)]).collect();
    Dataset::new(vec!["x".into()], rows).unwrap()
}

// --- Train/test split properties ---

proptest! {
    #[test]
    fn split_partitions_cover_every_row(
        n in 2usize..400,
        fraction in 0.01f64..0.99,
        seed in any::<u64>(),
    ) {
        let ds = dataset(n);
        let (train, test) = split_train_test(&ds, fraction, seed).unwrap();
        prop_assert_eq!(train.row_count() + test.row_count(), n);
        prop_assert!(test.row_count() >= 1);
        prop_assert!(train.row_count() >= 1);

        // Partition, not projection: every row lands on exactly one side.
        let mut seen: Vec<i64> = train
            .rows()
            .iter()
            .chain(test.rows())
            .map(|r| r[0].as_i64().unwrap())
            .collect();
        seen.sort_unstable();
        let expected: Vec<i64> = (0..n as i64).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn split_is_deterministic_for_fixed_seed(
        n in 2usize..200,
        fraction in 0.05f64..0.95,
        seed in any::<u64>(),
    ) {
        let ds = dataset(n);
        let (a_train, a_test) = split_train_test(&ds, fraction, seed).unwrap();
        let (b_train, b_test) = split_train_test(&ds, fraction, seed).unwrap();
        prop_assert_eq!(a_train.rows(), b_train.rows());
        prop_assert_eq!(a_test.rows(), b_test.rows());
    }
}

// --- Scaling leakage/order-independence properties ---

proptest! {
    #[test]
    fn fitted_parameters_ignore_row_order(
        values in proptest::collection::vec(-1e6f64..1e6, 3..60),
        rotate in 1usize..50,
    ) {
        let n = values.len();
        let frame = NumericFrame {
            columns: vec!["v".into()],
            data: Array2::from_shape_vec((n, 1), values.clone()).unwrap(),
        };
        let mut rotated = values;
        rotated.rotate_left(rotate % n);
        let permuted = NumericFrame {
            columns: vec!["v".into()],
            data: Array2::from_shape_vec((n, 1), rotated).unwrap(),
        };

        let prep = ColumnPreprocessor::new(vec!["v".into()], vec![]);
        let a = serde_json::to_string(&prep.fit(&frame).unwrap()).unwrap();
        let b = serde_json::to_string(&prep.fit(&permuted).unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }
}

// --- Acceptance rule algebra ---

proptest! {
    #[test]
    fn acceptance_matches_strict_improvement_rule(
        trained in 0.0f64..1.0,
        baseline in proptest::option::of(0.0f64..1.0),
    ) {
        let (accepted, delta) = acceptance(trained, baseline);
        let effective = baseline.unwrap_or(0.0);
        prop_assert_eq!(accepted, trained > effective.max(0.0));
        prop_assert!((delta - (trained - effective)).abs() < 1e-15);
    }

    #[test]
    fn no_baseline_always_accepts_positive_metric(trained in 1e-9f64..1.0) {
        let (accepted, delta) = acceptance(trained, None);
        prop_assert!(accepted);
        prop_assert_eq!(delta, trained);
    }
}
