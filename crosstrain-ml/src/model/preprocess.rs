//! Column-wise scaling: fit on the train partition, apply to anything.
//!
//! Output column order is fixed: standard-scaled columns first, then
//! min-max-scaled columns, then every remaining input column passed through
//! in its original order. The fitted parameters depend only on the frame the
//! preprocessor was fitted on, never on later transform inputs.

use crate::data::frame::NumericFrame;
use crate::error::PipelineError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How one output column is derived from its input column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnScaling {
    /// Zero-mean, unit-variance. A zero-variance column keeps scale 1, so it
    /// transforms to all zeros.
    Standard { mean: f64, scale: f64 },
    /// Map the fitted [min, max] range onto [0, 1]. A degenerate range keeps
    /// scale 1.
    MinMax { min: f64, scale: f64 },
    Passthrough,
}

impl ColumnScaling {
    fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Standard { mean, scale } => (x - mean) / scale,
            Self::MinMax { min, scale } => (x - min) / scale,
            Self::Passthrough => x,
        }
    }
}

/// Unfitted preprocessor: which columns get which scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    standard_columns: Vec<String>,
    min_max_columns: Vec<String>,
}

/// One fitted output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumn {
    pub name: String,
    pub scaling: ColumnScaling,
}

/// Fitted, serializable preprocessor. Reused verbatim at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    columns: Vec<FittedColumn>,
}

impl ColumnPreprocessor {
    pub fn new(standard_columns: Vec<String>, min_max_columns: Vec<String>) -> Self {
        Self {
            standard_columns,
            min_max_columns,
        }
    }

    /// Fit scaling parameters on `train`. Every configured column must be
    /// present in the frame.
    pub fn fit(&self, train: &NumericFrame) -> Result<FittedPreprocessor, PipelineError> {
        let mut columns = Vec::new();

        for name in &self.standard_columns {
            let mut values = column(train, name)?;
            // Summing over a sorted copy keeps the fitted parameters
            // independent of row order.
            values.sort_by(f64::total_cmp);
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            let var =
                values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len().max(1) as f64;
            let std = var.sqrt();
            columns.push(FittedColumn {
                name: name.clone(),
                scaling: ColumnScaling::Standard {
                    mean,
                    scale: if std > 0.0 { std } else { 1.0 },
                },
            });
        }

        for name in &self.min_max_columns {
            let values = column(train, name)?;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            columns.push(FittedColumn {
                name: name.clone(),
                scaling: ColumnScaling::MinMax {
                    min,
                    scale: if range > 0.0 { range } else { 1.0 },
                },
            });
        }

        let scaled: Vec<&String> = self
            .standard_columns
            .iter()
            .chain(self.min_max_columns.iter())
            .collect();
        for name in &train.columns {
            if !scaled.iter().any(|s| *s == name) {
                columns.push(FittedColumn {
                    name: name.clone(),
                    scaling: ColumnScaling::Passthrough,
                });
            }
        }

        Ok(FittedPreprocessor { columns })
    }
}

impl FittedPreprocessor {
    /// Names of the output columns, in transformed order.
    pub fn output_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Apply the fitted transform. Never re-fits; the input frame has no
    /// influence on the parameters.
    pub fn transform(&self, frame: &NumericFrame) -> Result<NumericFrame, PipelineError> {
        let rows = frame.row_count();
        let mut data = Array2::<f64>::zeros((rows, self.columns.len()));

        for (out_idx, fitted) in self.columns.iter().enumerate() {
            let in_idx = frame.column_index(&fitted.name).ok_or_else(|| {
                PipelineError::transform(format!(
                    "transform: fitted column {} missing from input frame",
                    fitted.name
                ))
            })?;
            for row in 0..rows {
                data[[row, out_idx]] = fitted.scaling.apply(frame.data[[row, in_idx]]);
            }
        }

        Ok(NumericFrame {
            columns: self.output_columns(),
            data,
        })
    }
}

fn column(frame: &NumericFrame, name: &str) -> Result<Vec<f64>, PipelineError> {
    let idx = frame.column_index(name).ok_or_else(|| {
        PipelineError::transform(format!("fit: scaling column {name} missing from train frame"))
    })?;
    Ok(frame.data.column(idx).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn frame() -> NumericFrame {
        NumericFrame {
            columns: vec!["a".into(), "b".into(), "c".into()],
            data: array![[1.0, 10.0, 7.0], [3.0, 20.0, 8.0], [5.0, 30.0, 9.0]],
        }
    }

    #[test]
    fn test_fit_transform_layout() {
        let prep = ColumnPreprocessor::new(vec!["a".into()], vec!["b".into()]);
        let fitted = prep.fit(&frame()).unwrap();
        assert_eq!(fitted.output_columns(), ["a", "b", "c"]);

        let out = fitted.transform(&frame()).unwrap();
        // a: mean 3, std sqrt(8/3)
        let std = (8.0f64 / 3.0).sqrt();
        assert!((out.data[[0, 0]] - (1.0 - 3.0) / std).abs() < 1e-12);
        // b: [10,30] -> [0,1]
        assert_eq!(out.data[[1, 1]], 0.5);
        // c passthrough
        assert_eq!(out.data[[2, 2]], 9.0);
    }

    #[test]
    fn test_scaled_columns_lead_output_order() {
        let prep = ColumnPreprocessor::new(vec!["c".into()], vec!["a".into()]);
        let fitted = prep.fit(&frame()).unwrap();
        assert_eq!(fitted.output_columns(), ["c", "a", "b"]);
    }

    #[test]
    fn test_fit_is_row_order_independent() {
        let f = frame();
        let permuted = NumericFrame {
            columns: f.columns.clone(),
            data: array![[5.0, 30.0, 9.0], [1.0, 10.0, 7.0], [3.0, 20.0, 8.0]],
        };
        let prep = ColumnPreprocessor::new(vec!["a".into()], vec!["b".into()]);
        let fitted = prep.fit(&f).unwrap();
        let refitted = prep.fit(&permuted).unwrap();
        assert_eq!(fitted.columns, refitted.columns);
    }

    #[test]
    fn test_transform_does_not_refit() {
        let prep = ColumnPreprocessor::new(vec!["a".into()], vec![]);
        let fitted = prep.fit(&frame()).unwrap();
        let other = NumericFrame {
            columns: vec!["a".into(), "b".into(), "c".into()],
            data: array![[100.0, 0.0, 0.0]],
        };
        let out = fitted.transform(&other).unwrap();
        let std = (8.0f64 / 3.0).sqrt();
        // Scaled with the train-fitted mean/std, not the new frame's.
        assert!((out.data[[0, 0]] - (100.0 - 3.0) / std).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_column() {
        let flat = NumericFrame {
            columns: vec!["a".into()],
            data: array![[4.0], [4.0]],
        };
        let prep = ColumnPreprocessor::new(vec!["a".into()], vec![]);
        let out = prep.fit(&flat).unwrap().transform(&flat).unwrap();
        assert_eq!(out.data[[0, 0]], 0.0);
    }

    #[test]
    fn test_missing_column_errors() {
        let prep = ColumnPreprocessor::new(vec!["zzz".into()], vec![]);
        assert!(prep.fit(&frame()).is_err());

        let prep = ColumnPreprocessor::new(vec!["a".into()], vec![]);
        let fitted = prep.fit(&frame()).unwrap();
        let narrow = NumericFrame {
            columns: vec!["b".into()],
            data: array![[1.0]],
        };
        assert!(fitted.transform(&narrow).is_err());
    }
}
