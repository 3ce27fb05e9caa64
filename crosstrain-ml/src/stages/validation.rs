//! Validation stage: the gate between ingestion and everything downstream.

use crate::artifact::{IngestionArtifact, ValidationArtifact};
use crate::config::StorageConfig;
use crate::data::frame::Dataset;
use crate::error::PipelineError;
use crate::persistence::atomic_write_json;
use crate::schema::SchemaCatalog;
use serde::{Deserialize, Serialize};

/// Outcome of a single check on a single dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub dataset: String,
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

/// Structured report persisted for every run, pass or fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub message: String,
    pub checks: Vec<CheckOutcome>,
}

/// Checks both ingested partitions against the schema catalog. The result is
/// a gate: a failing report ends the run as a normal terminal state.
pub struct ValidationStage<'a> {
    schema: &'a SchemaCatalog,
    storage: &'a StorageConfig,
}

impl<'a> ValidationStage<'a> {
    pub fn new(schema: &'a SchemaCatalog, storage: &'a StorageConfig) -> Self {
        Self { schema, storage }
    }

    pub fn run(&self, ingestion: &IngestionArtifact) -> Result<ValidationArtifact, PipelineError> {
        let train = Dataset::from_csv(&ingestion.train_path)?;
        let test = Dataset::from_csv(&ingestion.test_path)?;

        let mut checks = Vec::new();
        let mut message = String::new();

        for (name, dataset) in [("train", &train), ("test", &test)] {
            let count = self.check_column_count(name, dataset);
            if !count.passed {
                message.push_str(&count.detail);
                message.push(' ');
            }
            checks.push(count);

            let presence = self.check_required_columns(name, dataset);
            if !presence.passed {
                message.push_str(&presence.detail);
                message.push(' ');
            }
            checks.push(presence);
        }

        let passed = checks.iter().all(|c| c.passed);
        let message = message.trim_end().to_string();

        let report = ValidationReport {
            passed,
            message: message.clone(),
            checks,
        };
        let report_path = self.storage.validation_report_path();
        atomic_write_json(&report_path, &report)?;
        tracing::info!(passed, path = %report_path.display(), "Validation report written");

        Ok(ValidationArtifact {
            passed,
            message,
            report_path,
        })
    }

    fn check_column_count(&self, name: &str, dataset: &Dataset) -> CheckOutcome {
        let expected = self.schema.expected_column_count();
        let actual = dataset.column_count();
        let passed = actual == expected;
        CheckOutcome {
            dataset: name.to_string(),
            check: "column_count".to_string(),
            passed,
            detail: if passed {
                format!("{name} dataset has the expected {expected} columns.")
            } else {
                format!("{name} dataset has {actual} columns, expected {expected}.")
            },
        }
    }

    /// Collects every missing required column, not just the first.
    fn check_required_columns(&self, name: &str, dataset: &Dataset) -> CheckOutcome {
        let missing: Vec<&str> = self
            .schema
            .numeric_columns()
            .iter()
            .chain(self.schema.categorical_columns())
            .filter(|c| !dataset.has_column(c))
            .map(String::as_str)
            .collect();

        let passed = missing.is_empty();
        CheckOutcome {
            dataset: name.to_string(),
            check: "required_columns".to_string(),
            passed,
            detail: if passed {
                format!("{name} dataset contains all required columns.")
            } else {
                format!(
                    "{name} dataset is missing required columns: {}.",
                    missing.join(", ")
                )
            },
        }
    }
}
