//! Configuration types for the crosstrain-ml crate.
//!
//! Each stage reads its own sub-config. Defaults reproduce the reference
//! deployment; a TOML file and `CROSSTRAIN_`-prefixed environment variables
//! can override any field (layering is done by the CLI).

use crate::error::PipelineError;
use crate::model::tree::SplitCriterion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Local artifact storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Ingestion stage configuration.
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Transformation stage configuration.
    #[serde(default)]
    pub transformation: TransformationConfig,
    /// Training stage configuration.
    #[serde(default)]
    pub trainer: TrainerConfig,
    /// Model registry (object store) configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl PipelineConfig {
    /// Reject values that would fail deep inside a stage.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let fraction = self.ingestion.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(PipelineError::config(format!(
                "ingestion.test_fraction must be in (0, 1), got {fraction}"
            )));
        }
        if self.trainer.n_estimators == 0 {
            return Err(PipelineError::config("trainer.n_estimators must be positive"));
        }
        if !(0.0..=1.0).contains(&self.trainer.expected_accuracy) {
            return Err(PipelineError::config(format!(
                "trainer.expected_accuracy must be in [0, 1], got {}",
                self.trainer.expected_accuracy
            )));
        }
        Ok(())
    }
}

/// Where pipeline artifacts land on local durable storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all run artifacts.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Path to the declarative schema file.
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            schema_path: default_schema_path(),
        }
    }
}

impl StorageConfig {
    pub fn feature_store_path(&self) -> PathBuf {
        self.artifact_dir.join("feature_store").join("data.csv")
    }

    pub fn train_path(&self) -> PathBuf {
        self.artifact_dir.join("ingested").join("train.csv")
    }

    pub fn test_path(&self) -> PathBuf {
        self.artifact_dir.join("ingested").join("test.csv")
    }

    pub fn validation_report_path(&self) -> PathBuf {
        self.artifact_dir.join("validation").join("report.json")
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.artifact_dir.join("transformed").join("preprocessor.json")
    }

    pub fn train_matrix_path(&self) -> PathBuf {
        self.artifact_dir.join("transformed").join("train.json")
    }

    pub fn test_matrix_path(&self) -> PathBuf {
        self.artifact_dir.join("transformed").join("test.json")
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join("trained").join("model.json")
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("config/schema.yaml")
}

/// Ingestion stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Collection to export from the document store.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Root directory of the file-backed document store (CLI wiring).
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Held-out fraction for the train/test split, in (0, 1).
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the shuffled split; fixed for reproducibility.
    #[serde(default = "default_split_seed")]
    pub seed: u64,
    /// Identifier column dropped after the feature-store snapshot. The same
    /// name is honored by the transformation and evaluation stages.
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            source_dir: default_source_dir(),
            test_fraction: default_test_fraction(),
            seed: default_split_seed(),
            id_column: default_id_column(),
        }
    }
}

fn default_collection() -> String {
    "policies".to_string()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".crosstrain/source")
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_split_seed() -> u64 {
    22
}

fn default_id_column() -> String {
    "id".to_string()
}

/// A two-level string flag encoded to 0/1 before one-hot encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagEncoding {
    pub column: String,
    /// Level mapped to 0.
    pub zero: String,
    /// Level mapped to 1.
    pub one: String,
}

/// Transformation stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationConfig {
    /// Binary flag column encoded before one-hot encoding (no-op if absent).
    #[serde(default = "default_flag_encoding")]
    pub flag_encoding: FlagEncoding,
    /// Generated one-hot names rewritten to storage-safe canonical names.
    #[serde(default = "default_rename_map")]
    pub rename_map: Vec<(String, String)>,
    /// Generated boolean columns coerced to integer 0/1.
    #[serde(default = "default_int_coerce")]
    pub int_coerce_columns: Vec<String>,
    /// Also resample the held-out test set. Matches the reference behavior,
    /// at the cost of letting synthetic points into the evaluation matrix.
    #[serde(default = "default_true")]
    pub resample_test: bool,
    /// Nearest neighbours considered when synthesizing minority points.
    #[serde(default = "default_smote_neighbors")]
    pub smote_neighbors: usize,
    /// Nearest neighbours consulted by the edited-nearest-neighbour cleanup.
    #[serde(default = "default_enn_neighbors")]
    pub enn_neighbors: usize,
    /// Seed for the resampler.
    #[serde(default = "default_resample_seed")]
    pub resample_seed: u64,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            flag_encoding: default_flag_encoding(),
            rename_map: default_rename_map(),
            int_coerce_columns: default_int_coerce(),
            resample_test: true,
            smote_neighbors: default_smote_neighbors(),
            enn_neighbors: default_enn_neighbors(),
            resample_seed: default_resample_seed(),
        }
    }
}

fn default_flag_encoding() -> FlagEncoding {
    FlagEncoding {
        column: "Gender".to_string(),
        zero: "Female".to_string(),
        one: "Male".to_string(),
    }
}

fn default_rename_map() -> Vec<(String, String)> {
    vec![
        (
            "Vehicle_Age_< 1 Year".to_string(),
            "Vehicle_Age_lt_1_Year".to_string(),
        ),
        (
            "Vehicle_Age_> 2 Years".to_string(),
            "Vehicle_Age_gt_2_Years".to_string(),
        ),
    ]
}

fn default_int_coerce() -> Vec<String> {
    vec![
        "Vehicle_Age_lt_1_Year".to_string(),
        "Vehicle_Age_gt_2_Years".to_string(),
        "Vehicle_Damage_Yes".to_string(),
    ]
}

fn default_smote_neighbors() -> usize {
    5
}

fn default_enn_neighbors() -> usize {
    3
}

fn default_resample_seed() -> u64 {
    42
}

/// Training stage configuration (random forest hyperparameters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_criterion")]
    pub criterion: SplitCriterion,
    #[serde(default = "default_forest_seed")]
    pub seed: u64,
    /// Minimum training-set accuracy a model must reach to be persisted.
    #[serde(default = "default_expected_accuracy")]
    pub expected_accuracy: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_depth: default_max_depth(),
            criterion: default_criterion(),
            seed: default_forest_seed(),
            expected_accuracy: default_expected_accuracy(),
        }
    }
}

fn default_n_estimators() -> usize {
    101
}

fn default_min_samples_split() -> usize {
    7
}

fn default_min_samples_leaf() -> usize {
    6
}

fn default_max_depth() -> Option<usize> {
    Some(10)
}

fn default_criterion() -> SplitCriterion {
    SplitCriterion::Entropy
}

fn default_forest_seed() -> u64 {
    101
}

fn default_expected_accuracy() -> f64 {
    0.6
}

/// Model registry (object store) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root directory of the file-backed model store (CLI wiring).
    #[serde(default = "default_registry_root")]
    pub root: PathBuf,
    /// Key the deployed baseline lives under.
    #[serde(default = "default_model_key")]
    pub model_key: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: default_registry_root(),
            model_key: default_model_key(),
        }
    }
}

fn default_registry_root() -> PathBuf {
    PathBuf::from(".crosstrain/registry")
}

fn default_model_key() -> String {
    "production/model.json".to_string()
}

fn default_true() -> bool {
    true
}
