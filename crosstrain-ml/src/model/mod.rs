//! Numeric core: preprocessing, resampling, the forest classifier and its
//! evaluation metrics, and the deployable bundle.

pub mod bundle;
pub mod forest;
pub mod metrics;
pub mod preprocess;
pub mod resample;
pub mod tree;

pub use bundle::{BundleMetadata, ModelBundle};
pub use forest::{ForestParams, RandomForestClassifier};
pub use metrics::{ClassificationReport, accuracy, classification_report, weighted_f1};
pub use preprocess::{ColumnPreprocessor, FittedPreprocessor};
pub use resample::SmoteEnn;
pub use tree::SplitCriterion;
