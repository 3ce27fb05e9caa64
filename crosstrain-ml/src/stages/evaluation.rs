//! Evaluation stage: score the freshly trained model against the deployed
//! baseline on the original held-out test set.
//!
//! Features are re-derived from the ingested test CSV — not the resampled
//! matrix — through the same engineering steps and the persisted fitted
//! preprocessor, so both models are judged on identical, untouched inputs.

use crate::artifact::{EvaluationArtifact, IngestionArtifact, TrainerArtifact, TransformationArtifact};
use crate::config::TransformationConfig;
use crate::data::frame::Dataset;
use crate::error::PipelineError;
use crate::model::metrics::weighted_f1;
use crate::model::preprocess::FittedPreprocessor;
use crate::persistence::load_json;
use crate::registry::ModelStore;
use crate::schema::SchemaCatalog;
use crate::stages::transformation::{engineer_features, take_target};

/// The acceptance rule: a trained model wins only by strictly beating the
/// effective baseline, which is 0 when no baseline is deployed — so a
/// first-ever model is always accepted. Returns `(accepted, delta)`.
pub fn acceptance(trained_metric: f64, baseline_metric: Option<f64>) -> (bool, f64) {
    let effective = baseline_metric.unwrap_or(0.0);
    (
        trained_metric > effective,
        trained_metric - effective,
    )
}

pub struct EvaluationStage<'a, M: ModelStore> {
    schema: &'a SchemaCatalog,
    config: &'a TransformationConfig,
    store: &'a M,
    model_key: &'a str,
}

impl<'a, M: ModelStore> EvaluationStage<'a, M> {
    pub fn new(
        schema: &'a SchemaCatalog,
        config: &'a TransformationConfig,
        store: &'a M,
        model_key: &'a str,
    ) -> Self {
        Self {
            schema,
            config,
            store,
            model_key,
        }
    }

    pub fn run(
        &self,
        ingestion: &IngestionArtifact,
        transformation: &TransformationArtifact,
        trainer: &TrainerArtifact,
    ) -> Result<EvaluationArtifact, PipelineError> {
        let trained_metric = trainer.metrics.f1;

        let baseline_metric = if self.store.exists(self.model_key)? {
            let mut test = Dataset::from_csv(&ingestion.test_path)?;
            let target = take_target(&mut test, self.schema.target_column())?;
            engineer_features(&mut test, self.schema, self.config)?;

            let fitted: FittedPreprocessor = load_json(&transformation.transformer_path)?
                .ok_or_else(|| {
                    PipelineError::evaluation(format!(
                        "fitted transformer missing at {}",
                        transformation.transformer_path.display()
                    ))
                })?;
            let features = fitted.transform(&test.to_numeric()?)?;

            let baseline = self.store.get(self.model_key)?;
            let predictions = baseline.predict_transformed(&features.data);
            let score = weighted_f1(&target, &predictions);
            tracing::info!(
                baseline_f1 = score,
                trained_f1 = trained_metric,
                "Baseline scored on re-derived test features"
            );
            Some(score)
        } else {
            tracing::info!("No baseline deployed; trained model is accepted by default");
            None
        };

        let (accepted, delta) = acceptance(trained_metric, baseline_metric);
        tracing::info!(accepted, delta, "Evaluation decision");

        Ok(EvaluationArtifact {
            accepted,
            baseline_metric,
            trained_metric,
            delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MetricSummary;
    use crate::config::StorageConfig;
    use crate::model::bundle::ModelBundle;
    use crate::model::forest::{ForestParams, RandomForestClassifier};
    use crate::model::preprocess::ColumnPreprocessor;
    use crate::model::tree::SplitCriterion;
    use crate::data::frame::NumericFrame;
    use crate::registry::FsModelStore;
    use crate::stages::transformation::TransformationStage;
    use crate::artifact::ValidationArtifact;
    use ndarray::Array2;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_acceptance_without_baseline_always_accepts() {
        let (accepted, delta) = acceptance(0.01, None);
        assert!(accepted);
        assert_eq!(delta, 0.01);
    }

    #[test]
    fn test_acceptance_requires_strict_improvement() {
        let (accepted, delta) = acceptance(0.75, Some(0.80));
        assert!(!accepted);
        assert!((delta + 0.05).abs() < 1e-12);

        let (tied, _) = acceptance(0.80, Some(0.80));
        assert!(!tied);

        let (better, _) = acceptance(0.81, Some(0.80));
        assert!(better);
    }

    fn schema(dir: &Path) -> SchemaCatalog {
        let path = dir.join("schema.yaml");
        std::fs::write(
            &path,
            r#"
columns: [Gender, Age, Response]
numerical_column: [Age]
categorical_column: [Gender]
num_features: [Age]
mm_columns: []
drop_columns: id
"#,
        )
        .unwrap();
        SchemaCatalog::load(&path).unwrap()
    }

    /// Both features predict the label: Male rows are old and respond, Female
    /// rows are young and don't. Keeps baseline scoring deterministic.
    fn dataset(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let male = i % 2 == 0;
                let age = if male { 60 + (i % 20) as i64 } else { 20 + (i % 20) as i64 };
                vec![
                    json!(if male { "Male" } else { "Female" }),
                    json!(age),
                    json!(male as i64),
                ]
            })
            .collect();
        Dataset::new(
            vec!["Gender".into(), "Age".into(), "Response".into()],
            rows,
        )
        .unwrap()
    }

    /// Run the real transformation stage to get coherent inputs.
    fn prepared(dir: &Path) -> (SchemaCatalog, TransformationConfig, IngestionArtifact, TransformationArtifact)
    {
        let schema = schema(dir);
        let config = TransformationConfig {
            resample_test: false,
            ..TransformationConfig::default()
        };
        let storage = StorageConfig {
            artifact_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        };
        let ingestion = IngestionArtifact {
            train_path: dir.join("train.csv"),
            test_path: dir.join("test.csv"),
        };
        dataset(40).to_csv(&ingestion.train_path).unwrap();
        dataset(16).to_csv(&ingestion.test_path).unwrap();

        let gate = ValidationArtifact {
            passed: true,
            message: String::new(),
            report_path: dir.join("report.json"),
        };
        let transformation = TransformationStage::new(&schema, &config, &storage)
            .run(&ingestion, &gate)
            .unwrap();
        (schema, config, ingestion, transformation)
    }

    fn trainer_artifact(f1: f64) -> TrainerArtifact {
        TrainerArtifact {
            model_path: "unused.json".into(),
            metrics: MetricSummary {
                f1,
                precision: f1,
                recall: f1,
            },
        }
    }

    fn baseline_bundle() -> ModelBundle {
        // Trained on the layout the transformation stage produces, [Age,
        // Gender]. Classes sit on opposite sides of a wide margin on both
        // features, so every grown tree separates them and the whole vote is
        // a perfect classifier on the re-derived test features.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..6 {
            rows.extend([-1.2 + 0.08 * i as f64, 0.0]);
            labels.push(0.0);
            rows.extend([0.8 + 0.08 * i as f64, 1.0]);
            labels.push(1.0);
        }
        let frame = NumericFrame {
            columns: vec!["Age".into(), "Gender".into()],
            data: Array2::from_shape_vec((12, 2), rows).unwrap(),
        };
        let fitted = ColumnPreprocessor::new(vec![], vec![]).fit(&frame).unwrap();
        let forest = RandomForestClassifier::fit(
            &frame.data,
            &labels,
            &ForestParams {
                n_estimators: 9,
                criterion: SplitCriterion::Gini,
                max_depth: None,
                min_samples_split: 2,
                min_samples_leaf: 1,
                seed: 3,
            },
        )
        .unwrap();
        ModelBundle::new(fitted, forest, 3).unwrap()
    }

    #[test]
    fn test_no_baseline_accepts_weak_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let (schema, config, ingestion, transformation) = prepared(dir.path());
        let store = FsModelStore::new(dir.path().join("registry"));

        let artifact = EvaluationStage::new(&schema, &config, &store, "production/model.json")
            .run(&ingestion, &transformation, &trainer_artifact(0.01))
            .unwrap();

        assert!(artifact.accepted);
        assert_eq!(artifact.baseline_metric, None);
        assert_eq!(artifact.trained_metric, 0.01);
        assert_eq!(artifact.delta, 0.01);
    }

    #[test]
    fn test_strong_baseline_rejects_weaker_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let (schema, config, ingestion, transformation) = prepared(dir.path());
        let store = FsModelStore::new(dir.path().join("registry"));
        store.put("production/model.json", &baseline_bundle()).unwrap();

        let artifact = EvaluationStage::new(&schema, &config, &store, "production/model.json")
            .run(&ingestion, &transformation, &trainer_artifact(0.05))
            .unwrap();

        // The baseline predicts Response from Gender perfectly, so its F1 is
        // 1.0 and a 0.05 trained model must be rejected.
        assert_eq!(artifact.baseline_metric, Some(1.0));
        assert!(!artifact.accepted);
        assert!(artifact.delta < 0.0);
    }
}
