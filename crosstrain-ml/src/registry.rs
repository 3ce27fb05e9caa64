//! Model store boundary: where the deployed baseline lives.
//!
//! Evaluation reads from it, promotion writes to it; no other stage touches
//! the store.

use crate::error::PipelineError;
use crate::model::bundle::ModelBundle;
use crate::persistence::{atomic_write_json, load_json};
use std::path::PathBuf;

/// Synchronous object-store access keyed by string paths.
pub trait ModelStore {
    fn exists(&self, key: &str) -> Result<bool, PipelineError>;
    fn get(&self, key: &str) -> Result<ModelBundle, PipelineError>;
    fn put(&self, key: &str, bundle: &ModelBundle) -> Result<(), PipelineError>;
}

/// File-backed model store rooted at a directory; keys are relative paths.
pub struct FsModelStore {
    root: PathBuf,
}

impl FsModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ModelStore for FsModelStore {
    fn exists(&self, key: &str) -> Result<bool, PipelineError> {
        Ok(self.resolve(key).exists())
    }

    fn get(&self, key: &str) -> Result<ModelBundle, PipelineError> {
        let path = self.resolve(key);
        load_json(&path)?.ok_or_else(|| {
            PipelineError::data_access(format!("model store get: no object at key {key}"))
        })
    }

    fn put(&self, key: &str, bundle: &ModelBundle) -> Result<(), PipelineError> {
        let path = self.resolve(key);
        atomic_write_json(&path, bundle).map_err(|e| {
            PipelineError::promotion(format!("model store put: upload to key {key} failed: {e}"))
        })?;
        tracing::info!(key, "Model uploaded");
        Ok(())
    }
}
