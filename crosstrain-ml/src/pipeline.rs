//! Pipeline orchestrator: sequences the stages, enforces the validation
//! gate, and branches promotion on the evaluation decision.
//!
//! The state machine is linear with one gate and one branch:
//! ingest → validate → (gate) → transform → train → evaluate →
//! (accepted?) → promote. No retries, no partial recovery; the first failure
//! halts the run. A failed validation gate is a normal terminal outcome, not
//! an error, and promotion failure never invalidates an otherwise successful
//! run.

use crate::artifact::EvaluationArtifact;
use crate::config::PipelineConfig;
use crate::data::source::DocumentStore;
use crate::error::PipelineError;
use crate::registry::ModelStore;
use crate::schema::SchemaCatalog;
use crate::stages::{
    EvaluationStage, IngestionStage, PromotionStage, TrainingStage, TransformationStage,
    ValidationStage,
};
use serde::{Deserialize, Serialize};

/// Which stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
    Promotion,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Validation => "validation",
            Self::Transformation => "transformation",
            Self::Training => "training",
            Self::Evaluation => "evaluation",
            Self::Promotion => "promotion",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The pipeline reached evaluation. `promoted` reflects the branch taken;
    /// a promotion failure is surfaced here without failing the run.
    Completed {
        evaluation: EvaluationArtifact,
        promoted: bool,
        promotion_error: Option<String>,
    },
    /// The validation gate did not pass. The run stopped on purpose; this is
    /// bad data, not a crash.
    ValidationFailed { message: String },
    /// A stage failed and the run halted.
    Failed { stage: StageKind, message: String },
}

/// What one invocation of the pipeline produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: uuid::Uuid,
    pub outcome: RunOutcome,
}

impl RunResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }

    pub fn failure_stage(&self) -> Option<&'static str> {
        match &self.outcome {
            RunOutcome::Completed { .. } => None,
            RunOutcome::ValidationFailed { .. } => Some(StageKind::Validation.as_str()),
            RunOutcome::Failed { stage, .. } => Some(stage.as_str()),
        }
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            RunOutcome::Completed {
                promoted,
                promotion_error,
                evaluation,
            } => match (promoted, promotion_error) {
                (true, _) => format!("model promoted (delta {:+.4})", evaluation.delta),
                (false, Some(err)) => format!("model accepted but promotion failed: {err}"),
                (false, None) => format!(
                    "trained model rejected against baseline (delta {:+.4})",
                    evaluation.delta
                ),
            },
            RunOutcome::ValidationFailed { message } => message.clone(),
            RunOutcome::Failed { message, .. } => message.clone(),
        }
    }
}

/// Owns the collaborator handles and the schema catalog for one run. The
/// document-store handle is created once and passed by reference into the
/// ingestion stage; there is no hidden global client.
pub struct TrainingPipeline<S: DocumentStore, M: ModelStore> {
    config: PipelineConfig,
    schema: SchemaCatalog,
    source: S,
    registry: M,
}

impl<S: DocumentStore, M: ModelStore> TrainingPipeline<S, M> {
    /// Validate the config and load the schema catalog once.
    pub fn new(config: PipelineConfig, source: S, registry: M) -> Result<Self, PipelineError> {
        config.validate()?;
        let schema = SchemaCatalog::load(&config.storage.schema_path)?;
        Ok(Self {
            config,
            schema,
            source,
            registry,
        })
    }

    pub fn schema(&self) -> &SchemaCatalog {
        &self.schema
    }

    /// Execute one full run. Stage failures become a structured outcome, not
    /// a panic or an error the caller has to dissect.
    pub fn run(&self) -> RunResult {
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(%run_id, "Pipeline run started");

        let outcome = match self.execute() {
            Ok(outcome) => outcome,
            Err((stage, error)) => {
                tracing::error!(%run_id, stage = %stage, error = %error, "Pipeline run failed");
                RunOutcome::Failed {
                    stage,
                    message: error.to_string(),
                }
            }
        };

        tracing::info!(%run_id, success = matches!(outcome, RunOutcome::Completed { .. }), "Pipeline run finished");
        RunResult { run_id, outcome }
    }

    fn execute(&self) -> Result<RunOutcome, (StageKind, PipelineError)> {
        let storage = &self.config.storage;

        let ingestion = IngestionStage::new(&self.config.ingestion, storage, &self.source)
            .run()
            .map_err(|e| (StageKind::Ingestion, e))?;

        let validation = ValidationStage::new(&self.schema, storage)
            .run(&ingestion)
            .map_err(|e| (StageKind::Validation, e))?;
        if !validation.passed {
            tracing::warn!(message = %validation.message, "Validation gate failed; stopping run");
            return Ok(RunOutcome::ValidationFailed {
                message: validation.message,
            });
        }

        let transformation =
            TransformationStage::new(&self.schema, &self.config.transformation, storage)
                .run(&ingestion, &validation)
                .map_err(|e| (StageKind::Transformation, e))?;

        let trainer = TrainingStage::new(&self.config.trainer, storage)
            .run(&transformation)
            .map_err(|e| (StageKind::Training, e))?;

        let model_key = self.config.registry.model_key.as_str();
        let evaluation = EvaluationStage::new(
            &self.schema,
            &self.config.transformation,
            &self.registry,
            model_key,
        )
        .run(&ingestion, &transformation, &trainer)
        .map_err(|e| (StageKind::Evaluation, e))?;

        if !evaluation.accepted {
            tracing::info!(delta = evaluation.delta, "Trained model not accepted; baseline stays");
            return Ok(RunOutcome::Completed {
                evaluation,
                promoted: false,
                promotion_error: None,
            });
        }

        match PromotionStage::new(&self.registry, model_key).run(&evaluation, &trainer) {
            Ok(_) => Ok(RunOutcome::Completed {
                evaluation,
                promoted: true,
                promotion_error: None,
            }),
            Err(error) => {
                tracing::warn!(%error, "Promotion failed; run remains successful through evaluation");
                Ok(RunOutcome::Completed {
                    evaluation,
                    promoted: false,
                    promotion_error: Some(error.to_string()),
                })
            }
        }
    }
}
