//! Transformation stage: deterministic feature engineering, train-fitted
//! scaling, and class rebalancing.
//!
//! The engineering steps run in a fixed order on both partitions with the
//! target column excluded first. Scaling parameters are fitted on the train
//! partition only; the test partition never influences them.

use crate::artifact::{IngestionArtifact, TransformationArtifact, ValidationArtifact};
use crate::config::{StorageConfig, TransformationConfig};
use crate::data::frame::{Dataset, NumericFrame, cell_to_f64};
use crate::error::PipelineError;
use crate::model::preprocess::ColumnPreprocessor;
use crate::model::resample::SmoteEnn;
use crate::persistence::atomic_write_json;
use crate::schema::SchemaCatalog;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted matrix of features with the target concatenated as the last
/// column, plus the descriptor that makes that layout explicit instead of a
/// positional convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedMatrix {
    /// All column names, target last.
    pub columns: Vec<String>,
    /// Name of the target column; always the final entry of `columns`.
    pub target_column: String,
    pub data: Array2<f64>,
}

impl TransformedMatrix {
    pub fn new(
        feature_columns: Vec<String>,
        target_column: String,
        features: Array2<f64>,
        target: &[f64],
    ) -> Result<Self, PipelineError> {
        if features.nrows() != target.len() {
            return Err(PipelineError::transform(format!(
                "matrix assembly: {} feature rows for {} target values",
                features.nrows(),
                target.len()
            )));
        }
        let mut columns = feature_columns;
        columns.push(target_column.clone());

        let (rows, width) = (features.nrows(), features.ncols() + 1);
        let mut data = Array2::<f64>::zeros((rows, width));
        for i in 0..rows {
            for j in 0..width - 1 {
                data[[i, j]] = features[[i, j]];
            }
            data[[i, width - 1]] = target[i];
        }
        Ok(Self {
            columns,
            target_column,
            data,
        })
    }

    /// Confirm the descriptor still matches the layout.
    pub fn validate_layout(&self) -> Result<(), PipelineError> {
        if self.columns.len() != self.data.ncols() {
            return Err(PipelineError::transform(format!(
                "matrix descriptor names {} columns but data has {}",
                self.columns.len(),
                self.data.ncols()
            )));
        }
        match self.columns.last() {
            Some(last) if *last == self.target_column => Ok(()),
            _ => Err(PipelineError::transform(format!(
                "matrix descriptor: target column {} is not the last column",
                self.target_column
            ))),
        }
    }

    /// Split back into features and target by the declared layout.
    pub fn split(&self) -> (Array2<f64>, Vec<f64>) {
        let width = self.data.ncols();
        let features = self.data.slice(ndarray::s![.., ..width - 1]).to_owned();
        let target = self.data.column(width - 1).to_vec();
        (features, target)
    }
}

/// Applies the engineering steps plus fitted scaling and resampling, and
/// persists everything the later stages need.
pub struct TransformationStage<'a> {
    schema: &'a SchemaCatalog,
    config: &'a TransformationConfig,
    storage: &'a StorageConfig,
}

impl<'a> TransformationStage<'a> {
    pub fn new(
        schema: &'a SchemaCatalog,
        config: &'a TransformationConfig,
        storage: &'a StorageConfig,
    ) -> Self {
        Self {
            schema,
            config,
            storage,
        }
    }

    pub fn run(
        &self,
        ingestion: &IngestionArtifact,
        validation: &ValidationArtifact,
    ) -> Result<TransformationArtifact, PipelineError> {
        if !validation.passed {
            return Err(PipelineError::validation(format!(
                "transformation requires a passed validation gate: {}",
                validation.message
            )));
        }

        let mut train = Dataset::from_csv(&ingestion.train_path)?;
        let mut test = Dataset::from_csv(&ingestion.test_path)?;

        let train_target = take_target(&mut train, self.schema.target_column())?;
        let test_target = take_target(&mut test, self.schema.target_column())?;

        engineer_features(&mut train, self.schema, self.config)?;
        engineer_features(&mut test, self.schema, self.config)?;

        let train_frame = train.to_numeric()?;
        let test_frame = test.to_numeric()?;

        let preprocessor = ColumnPreprocessor::new(
            self.schema.standard_scale_columns().to_vec(),
            self.schema.min_max_columns().to_vec(),
        );
        let fitted = preprocessor.fit(&train_frame)?;
        let train_scaled = fitted.transform(&train_frame)?;
        let test_scaled = fitted.transform(&test_frame)?;
        tracing::info!(
            columns = train_scaled.columns.len(),
            "Scaling fitted on train and applied to both partitions"
        );

        let resampler = SmoteEnn::new(
            self.config.smote_neighbors,
            self.config.enn_neighbors,
            self.config.resample_seed,
        );
        let (train_x, train_y) = resampler.fit_resample(&train_scaled.data, &train_target)?;
        let (test_x, test_y) = if self.config.resample_test {
            tracing::warn!(
                "Resampling the held-out test set; synthetic points will enter the evaluation matrix"
            );
            resampler.fit_resample(&test_scaled.data, &test_target)?
        } else {
            (test_scaled.data.clone(), test_target.clone())
        };
        tracing::info!(
            train_rows = train_x.nrows(),
            test_rows = test_x.nrows(),
            "Class rebalancing applied"
        );

        let target_name = self.schema.target_column().to_string();
        let train_matrix =
            TransformedMatrix::new(train_scaled.columns.clone(), target_name.clone(), train_x, &train_y)?;
        let test_matrix =
            TransformedMatrix::new(test_scaled.columns.clone(), target_name, test_x, &test_y)?;

        let transformer_path = self.storage.preprocessor_path();
        let train_array_path = self.storage.train_matrix_path();
        let test_array_path = self.storage.test_matrix_path();
        atomic_write_json(&transformer_path, &fitted)?;
        atomic_write_json(&train_array_path, &train_matrix)?;
        atomic_write_json(&test_array_path, &test_matrix)?;
        tracing::info!(path = %transformer_path.display(), "Fitted transformer persisted");

        Ok(TransformationArtifact {
            transformer_path,
            train_array_path,
            test_array_path,
        })
    }
}

/// Remove the target column and lower it to numeric labels.
pub(crate) fn take_target(
    dataset: &mut Dataset,
    target_column: &str,
) -> Result<Vec<f64>, PipelineError> {
    let values = dataset.take_column(target_column).ok_or_else(|| {
        PipelineError::schema(format!("target column {target_column} missing from dataset"))
    })?;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            cell_to_f64(v).ok_or_else(|| {
                PipelineError::transform(format!(
                    "target column {target_column} row {i}: cannot convert {v} to a label"
                ))
            })
        })
        .collect()
}

/// Steps 1–4 of the transformation: binary flag encoding, identifier drops,
/// one-hot encoding with first level dropped, canonical renames and integer
/// coercion. The evaluation stage re-runs exactly this to re-derive features.
pub(crate) fn engineer_features(
    frame: &mut Dataset,
    schema: &SchemaCatalog,
    config: &TransformationConfig,
) -> Result<(), PipelineError> {
    encode_flag_column(frame, schema, config)?;

    for name in schema.drop_columns() {
        frame.drop_column(name);
    }

    one_hot_encode(frame, schema, &config.flag_encoding.column)?;

    for (from, to) in &config.rename_map {
        frame.rename_column(from, to);
    }
    for name in &config.int_coerce_columns {
        frame.map_column(name, |v| match v {
            Value::Bool(b) => Ok(Value::Number((*b as i64).into())),
            other => Ok(other.clone()),
        })?;
    }
    Ok(())
}

fn encode_flag_column(
    frame: &mut Dataset,
    schema: &SchemaCatalog,
    config: &TransformationConfig,
) -> Result<(), PipelineError> {
    let flag = &config.flag_encoding;
    if !frame.has_column(&flag.column) {
        if !schema.knows_column(&flag.column) {
            return Err(PipelineError::schema(format!(
                "flag column {} is absent from both dataset and schema",
                flag.column
            )));
        }
        return Ok(());
    }

    frame.map_column(&flag.column, |v| match v {
        Value::String(s) if *s == flag.zero => Ok(Value::Number(0.into())),
        Value::String(s) if *s == flag.one => Ok(Value::Number(1.into())),
        Value::Number(n) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => Ok(v.clone()),
        other => Err(PipelineError::transform(format!(
            "flag column {}: cannot binary-encode {other}",
            flag.column
        ))),
    })?;
    Ok(())
}

/// One-hot encode every remaining categorical column, dropping the first
/// (lexicographically smallest) level per column. Nulls produce all-zero
/// indicator rows.
fn one_hot_encode(
    frame: &mut Dataset,
    schema: &SchemaCatalog,
    flag_column: &str,
) -> Result<(), PipelineError> {
    let candidates: Vec<String> = frame
        .columns()
        .iter()
        .filter(|c| schema.categorical_columns().contains(*c) && *c != flag_column)
        .cloned()
        .collect();

    for column in candidates {
        let Some(values) = frame.column_values(&column) else {
            continue;
        };

        let mut levels: Vec<String> = values
            .iter()
            .filter(|v| !v.is_null())
            .map(level_name)
            .collect();
        levels.sort();
        levels.dedup();

        // First level dropped to avoid collinearity.
        for level in levels.iter().skip(1) {
            let indicator: Vec<Value> = values
                .iter()
                .map(|v| {
                    let hit = !v.is_null() && level_name(v) == *level;
                    Value::Number((hit as i64).into())
                })
                .collect();
            frame.append_column(format!("{column}_{level}"), indicator)?;
        }
        frame.drop_column(&column);
    }
    Ok(())
}

fn level_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
