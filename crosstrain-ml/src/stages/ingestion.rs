//! Ingestion stage: export the source collection, snapshot it, split it.

use crate::artifact::IngestionArtifact;
use crate::config::{IngestionConfig, StorageConfig};
use crate::data::frame::Dataset;
use crate::data::source::{DocumentStore, materialize};
use crate::error::PipelineError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Fetches every record from the document store, persists the feature-store
/// snapshot, then writes a seeded shuffled train/test split.
pub struct IngestionStage<'a, S: DocumentStore> {
    config: &'a IngestionConfig,
    storage: &'a StorageConfig,
    store: &'a S,
}

impl<'a, S: DocumentStore> IngestionStage<'a, S> {
    pub fn new(config: &'a IngestionConfig, storage: &'a StorageConfig, store: &'a S) -> Self {
        Self {
            config,
            storage,
            store,
        }
    }

    pub fn run(&self) -> Result<IngestionArtifact, PipelineError> {
        let documents = self.store.fetch_all(&self.config.collection)?;
        if documents.is_empty() {
            return Err(PipelineError::data_access(format!(
                "ingestion: collection {} returned zero records",
                self.config.collection
            )));
        }

        let mut dataset = materialize(documents)?;
        tracing::info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Collection exported"
        );

        let snapshot = self.storage.feature_store_path();
        dataset.to_csv(&snapshot)?;
        tracing::info!(path = %snapshot.display(), "Feature store snapshot written");

        if dataset.drop_column(&self.config.id_column) {
            tracing::debug!(column = %self.config.id_column, "Identifier column dropped");
        }

        let (train, test) = split_train_test(&dataset, self.config.test_fraction, self.config.seed)?;
        tracing::info!(
            train_rows = train.row_count(),
            test_rows = test.row_count(),
            seed = self.config.seed,
            "Train/test split performed"
        );

        let train_path = self.storage.train_path();
        let test_path = self.storage.test_path();
        train.to_csv(&train_path)?;
        test.to_csv(&test_path)?;

        Ok(IngestionArtifact {
            train_path,
            test_path,
        })
    }
}

/// Seeded shuffled split. The held-out side gets `ceil(n * fraction)` rows;
/// a fixed seed reproduces the partition exactly.
pub fn split_train_test(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset), PipelineError> {
    let n = dataset.row_count();
    if n < 2 {
        return Err(PipelineError::data_access(format!(
            "ingestion split: need at least two records, got {n}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_count = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
    let test = dataset.select_rows(&indices[..test_count]);
    let train = dataset.select_rows(&indices[test_count..]);
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::JsonlDocumentStore;
    use serde_json::json;

    fn dataset(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| vec![json!(i), json!(i as f64 * 1.5)])
            .collect();
        Dataset::new(vec!["id".into(), "x".into()], rows).unwrap()
    }

    #[test]
    fn test_split_partition_sizes() {
        let ds = dataset(1000);
        let (train, test) = split_train_test(&ds, 0.2, 22).unwrap();
        assert_eq!(train.row_count(), 800);
        assert_eq!(test.row_count(), 200);
    }

    #[test]
    fn test_split_deterministic_for_fixed_seed() {
        let ds = dataset(50);
        let (a_train, a_test) = split_train_test(&ds, 0.3, 22).unwrap();
        let (b_train, b_test) = split_train_test(&ds, 0.3, 22).unwrap();
        assert_eq!(a_train.rows(), b_train.rows());
        assert_eq!(a_test.rows(), b_test.rows());

        let (c_train, _) = split_train_test(&ds, 0.3, 23).unwrap();
        assert_ne!(a_train.rows(), c_train.rows());
    }

    #[test]
    fn test_split_rejects_single_row() {
        let ds = dataset(1);
        assert!(split_train_test(&ds, 0.2, 22).is_err());
    }

    #[test]
    fn test_run_fails_on_empty_collection() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty.jsonl"), "").unwrap();
        let store = JsonlDocumentStore::new(dir.path());

        let mut config = IngestionConfig::default();
        config.collection = "empty".into();
        let storage = StorageConfig {
            artifact_dir: dir.path().join("artifacts"),
            ..StorageConfig::default()
        };

        let err = IngestionStage::new(&config, &storage, &store)
            .run()
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataAccess(_)));
    }

    #[test]
    fn test_run_snapshots_and_drops_identifier() {
        let dir = tempfile::TempDir::new().unwrap();
        let lines: String = (0..10)
            .map(|i| format!("{{\"id\": {i}, \"Age\": {}, \"Response\": {}}}\n", 20 + i, i % 2))
            .collect();
        std::fs::write(dir.path().join("policies.jsonl"), lines).unwrap();
        let store = JsonlDocumentStore::new(dir.path());

        let config = IngestionConfig {
            test_fraction: 0.3,
            ..IngestionConfig::default()
        };
        let storage = StorageConfig {
            artifact_dir: dir.path().join("artifacts"),
            ..StorageConfig::default()
        };

        let artifact = IngestionStage::new(&config, &storage, &store).run().unwrap();

        let snapshot = Dataset::from_csv(&storage.feature_store_path()).unwrap();
        assert!(snapshot.has_column("id"));

        let train = Dataset::from_csv(&artifact.train_path).unwrap();
        let test = Dataset::from_csv(&artifact.test_path).unwrap();
        assert!(!train.has_column("id"));
        assert_eq!(train.row_count() + test.row_count(), 10);
        assert_eq!(test.row_count(), 3);
    }
}
