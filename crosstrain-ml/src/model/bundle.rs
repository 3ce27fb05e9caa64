//! The deployable unit: fitted preprocessor + fitted forest, shipped and
//! versioned together so inference can start from raw engineered features.

use crate::data::frame::NumericFrame;
use crate::error::PipelineError;
use crate::model::forest::RandomForestClassifier;
use crate::model::preprocess::FittedPreprocessor;
use crate::persistence::sha256_hex;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Provenance carried alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    /// SHA-256 over the serialized forest, for audit of what was deployed.
    pub model_digest: String,
}

/// Fitted preprocessor and classifier as one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub preprocessor: FittedPreprocessor,
    pub model: RandomForestClassifier,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    pub fn new(
        preprocessor: FittedPreprocessor,
        model: RandomForestClassifier,
        seed: u64,
    ) -> Result<Self, PipelineError> {
        let model_digest = sha256_hex(serde_json::to_string(&model)?.as_bytes());
        Ok(Self {
            preprocessor,
            model,
            metadata: BundleMetadata {
                trained_at: Utc::now(),
                seed,
                model_digest,
            },
        })
    }

    /// Predict from engineered (pre-scaling) features: applies the bundled
    /// fitted preprocessor, then the forest.
    pub fn predict(&self, features: &NumericFrame) -> Result<Vec<f64>, PipelineError> {
        let scaled = self.preprocessor.transform(features)?;
        Ok(self.model.predict(scaled.data.view()))
    }

    /// Predict from an already-scaled matrix (the evaluation path, where one
    /// shared preprocessor scores old and new model on identical inputs).
    pub fn predict_transformed(&self, features: &Array2<f64>) -> Vec<f64> {
        self.model.predict(features.view())
    }
}
