//! Stage artifacts: one immutable value object per stage.
//!
//! Every path field names a fully-written, self-contained file at the moment
//! the artifact is returned; downstream stages never see partial writes
//! (writes go through the atomic helpers in [`crate::persistence`]).

use crate::model::metrics::ClassificationReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of the ingestion stage: where the split partitions landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

/// Output of the validation stage. `passed == false` gates the rest of the
/// pipeline without being treated as a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub passed: bool,
    pub message: String,
    pub report_path: PathBuf,
}

/// Output of the transformation stage: the fitted preprocessor and the two
/// resampled matrices (features with the target as last column).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformer_path: PathBuf,
    pub train_array_path: PathBuf,
    pub test_array_path: PathBuf,
}

/// Held-out metric summary bundled into the trainer artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
}

impl From<&ClassificationReport> for MetricSummary {
    fn from(report: &ClassificationReport) -> Self {
        Self {
            f1: report.f1,
            precision: report.precision,
            recall: report.recall,
        }
    }
}

/// Output of the training stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub model_path: PathBuf,
    pub metrics: MetricSummary,
}

/// Output of the evaluation stage: the acceptance decision against the
/// deployed baseline. `baseline_metric` is absent on a first-ever run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    pub accepted: bool,
    pub baseline_metric: Option<f64>,
    pub trained_metric: f64,
    pub delta: f64,
}

/// Output of the promotion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionArtifact {
    pub remote_model_path: String,
}
