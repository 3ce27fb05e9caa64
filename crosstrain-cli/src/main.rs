//! crosstrain CLI — entry point for the batch training pipeline.
//!
//! Loads layered configuration (defaults → TOML file → environment), wires
//! the file-backed collaborators, and triggers one synchronous pipeline run.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crosstrain_ml::data::JsonlDocumentStore;
use crosstrain_ml::registry::FsModelStore;
use crosstrain_ml::{PipelineConfig, SchemaCatalog, TrainingPipeline};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// crosstrain: staged batch training for tabular classification
#[derive(Parser, Debug)]
#[command(name = "crosstrain", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "crosstrain.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one full pipeline run
    Run,
    /// Load and validate the schema catalog, then exit
    CheckSchema,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli.config)?;
    tracing::debug!(path = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Run => run_pipeline(config),
        Commands::CheckSchema => check_schema(&config),
    }
}

fn run_pipeline(config: PipelineConfig) -> anyhow::Result<()> {
    let source = JsonlDocumentStore::new(config.ingestion.source_dir.clone());
    let registry = FsModelStore::new(config.registry.root.clone());

    let pipeline = TrainingPipeline::new(config, source, registry)
        .context("failed to construct pipeline")?;
    let result = pipeline.run();

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_schema(config: &PipelineConfig) -> anyhow::Result<()> {
    let catalog = SchemaCatalog::load(&config.storage.schema_path)
        .with_context(|| format!("schema at {}", config.storage.schema_path.display()))?;
    println!(
        "schema ok: {} columns, {} numeric, {} categorical, target {}",
        catalog.expected_column_count(),
        catalog.numeric_columns().len(),
        catalog.categorical_columns().len(),
        catalog.target_column()
    );
    Ok(())
}

/// Layered configuration: defaults -> TOML file -> CROSSTRAIN_* environment.
fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("CROSSTRAIN_").split("__"));
    figment
        .extract()
        .with_context(|| format!("invalid configuration ({})", path.display()))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_when_file_absent() {
        let config = load_config(Path::new("/nonexistent/crosstrain.toml")).unwrap();
        assert_eq!(config.ingestion.test_fraction, 0.2);
    }

    #[test]
    fn test_load_config_merges_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("crosstrain.toml");
        std::fs::write(
            &path,
            "[ingestion]\ntest_fraction = 0.3\ncollection = \"renewals\"\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.ingestion.test_fraction, 0.3);
        assert_eq!(config.ingestion.collection, "renewals");
        // Untouched sections keep their defaults.
        assert_eq!(config.trainer.n_estimators, 101);
    }
}
