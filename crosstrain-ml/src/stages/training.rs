//! Training stage: fit the forest, score it, gate on train accuracy, and
//! bundle it with the fitted preprocessor.

use crate::artifact::{MetricSummary, TrainerArtifact, TransformationArtifact};
use crate::config::{StorageConfig, TrainerConfig};
use crate::error::PipelineError;
use crate::model::bundle::ModelBundle;
use crate::model::forest::{ForestParams, RandomForestClassifier};
use crate::model::metrics::{accuracy, classification_report};
use crate::model::preprocess::FittedPreprocessor;
use crate::persistence::{atomic_write_json, load_json};
use crate::stages::transformation::TransformedMatrix;
use std::path::Path;

pub struct TrainingStage<'a> {
    config: &'a TrainerConfig,
    storage: &'a StorageConfig,
}

impl<'a> TrainingStage<'a> {
    pub fn new(config: &'a TrainerConfig, storage: &'a StorageConfig) -> Self {
        Self { config, storage }
    }

    pub fn run(
        &self,
        transformation: &TransformationArtifact,
    ) -> Result<TrainerArtifact, PipelineError> {
        let train = load_matrix(&transformation.train_array_path)?;
        let test = load_matrix(&transformation.test_array_path)?;

        let (x_train, y_train) = train.split();
        let (x_test, y_test) = test.split();
        tracing::info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            "Transformed matrices loaded"
        );

        let params = ForestParams {
            n_estimators: self.config.n_estimators,
            criterion: self.config.criterion,
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            seed: self.config.seed,
        };
        let forest = RandomForestClassifier::fit(&x_train, &y_train, &params)?;

        let held_out = classification_report(&y_test, &forest.predict(x_test.view()));
        tracing::info!(
            accuracy = held_out.accuracy,
            f1 = held_out.f1,
            precision = held_out.precision,
            recall = held_out.recall,
            "Held-out metrics computed"
        );

        let train_accuracy = accuracy(&y_train, &forest.predict(x_train.view()));
        if train_accuracy < self.config.expected_accuracy {
            return Err(PipelineError::training(format!(
                "no model met the accuracy threshold: train accuracy {train_accuracy:.4} < expected {:.4}",
                self.config.expected_accuracy
            )));
        }

        let preprocessor: FittedPreprocessor =
            load_json(&transformation.transformer_path)?.ok_or_else(|| {
                PipelineError::training(format!(
                    "fitted transformer missing at {}",
                    transformation.transformer_path.display()
                ))
            })?;

        let bundle = ModelBundle::new(preprocessor, forest, self.config.seed)?;
        let model_path = self.storage.model_path();
        atomic_write_json(&model_path, &bundle)?;
        tracing::info!(path = %model_path.display(), "Deployable bundle persisted");

        Ok(TrainerArtifact {
            model_path,
            metrics: MetricSummary::from(&held_out),
        })
    }
}

fn load_matrix(path: &Path) -> Result<TransformedMatrix, PipelineError> {
    let matrix: TransformedMatrix = load_json(path)?.ok_or_else(|| {
        PipelineError::training(format!("transformed matrix missing at {}", path.display()))
    })?;
    matrix.validate_layout()?;
    Ok(matrix)
}
