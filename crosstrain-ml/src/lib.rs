//! # crosstrain-ml — staged batch training pipeline
//!
//! Turns raw tabular policy records into a deployable classification model
//! through a fixed sequence of stages, each consuming immutable artifacts
//! produced by the stage before it:
//!
//! ingest → validate → (gate) → transform → train → evaluate → promote
//!
//! Data flows strictly forward; no stage mutates another stage's artifact.
//! The external document store and model store are seen through traits only
//! ([`data::DocumentStore`], [`registry::ModelStore`]) and injected into the
//! orchestrator, which runs everything synchronously.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;
pub mod schema;

// Data layer
pub mod artifact;
pub mod data;
pub mod registry;

// Numeric core
pub mod model;

// Stages and orchestration
pub mod pipeline;
pub mod stages;

// Re-exports
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{RunOutcome, RunResult, StageKind, TrainingPipeline};
pub use schema::{SchemaCatalog, TARGET_COLUMN};
