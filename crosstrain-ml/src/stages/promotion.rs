//! Promotion stage: replace the deployed baseline with the accepted model.

use crate::artifact::{EvaluationArtifact, PromotionArtifact, TrainerArtifact};
use crate::error::PipelineError;
use crate::model::bundle::ModelBundle;
use crate::persistence::load_json;
use crate::registry::ModelStore;

pub struct PromotionStage<'a, M: ModelStore> {
    store: &'a M,
    model_key: &'a str,
}

impl<'a, M: ModelStore> PromotionStage<'a, M> {
    pub fn new(store: &'a M, model_key: &'a str) -> Self {
        Self { store, model_key }
    }

    /// Upload the trained bundle, overwriting any prior deployment. The
    /// orchestrator only calls this on an accepted evaluation; the stage
    /// refuses anything else.
    pub fn run(
        &self,
        evaluation: &EvaluationArtifact,
        trainer: &TrainerArtifact,
    ) -> Result<PromotionArtifact, PipelineError> {
        if !evaluation.accepted {
            return Err(PipelineError::promotion(
                "refusing to promote a model the evaluation stage rejected",
            ));
        }

        let bundle: ModelBundle = load_json(&trainer.model_path)
            .map_err(|e| {
                PipelineError::promotion(format!(
                    "cannot read trained bundle at {}: {e}",
                    trainer.model_path.display()
                ))
            })?
            .ok_or_else(|| {
                PipelineError::promotion(format!(
                    "trained bundle missing at {}",
                    trainer.model_path.display()
                ))
            })?;

        self.store.put(self.model_key, &bundle)?;
        tracing::info!(key = self.model_key, delta = evaluation.delta, "Model promoted");

        Ok(PromotionArtifact {
            remote_model_path: self.model_key.to_string(),
        })
    }
}
