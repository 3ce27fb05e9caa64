//! Schema catalog — the declarative column contract loaded once per run.
//!
//! The schema file is YAML with the keys `columns`, `numerical_column`,
//! `categorical_column`, `num_features` (standard-scaled), `mm_columns`
//! (min-max-scaled) and `drop_columns` (scalar or list). The target column is
//! fixed by [`TARGET_COLUMN`]. Unknown or inconsistent keys are rejected at
//! load time rather than deep inside a transformation step.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Name of the label column the pipeline trains against.
pub const TARGET_COLUMN: &str = "Response";

/// `drop_columns` accepts a single name or a list of names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DropColumns {
    One(String),
    Many(Vec<String>),
}

impl Default for DropColumns {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl DropColumns {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::One(name) => BTreeSet::from([name]),
            Self::Many(names) => names.into_iter().collect(),
        }
    }
}

/// On-disk shape of the schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchema {
    columns: Vec<String>,
    numerical_column: Vec<String>,
    categorical_column: Vec<String>,
    num_features: Vec<String>,
    mm_columns: Vec<String>,
    #[serde(default)]
    drop_columns: DropColumns,
}

/// Validated, immutable view of the schema file.
///
/// Column roles are pairwise disjoint and never contain the target column;
/// violations surface as [`PipelineError::Schema`] at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCatalog {
    expected_column_count: usize,
    numeric_columns: BTreeSet<String>,
    categorical_columns: BTreeSet<String>,
    /// Standard-scaled columns, in schema order (drives transformed layout).
    standard_scale_columns: Vec<String>,
    /// Min-max-scaled columns, in schema order.
    min_max_columns: Vec<String>,
    drop_columns: BTreeSet<String>,
    target_column: String,
}

impl SchemaCatalog {
    /// Load and validate the schema file. Called once per run.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::schema(format!(
                "schema load: cannot read {}: {e}",
                path.display()
            ))
        })?;
        let raw: RawSchema = serde_yaml::from_str(&content)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSchema) -> Result<Self, PipelineError> {
        let catalog = Self {
            expected_column_count: raw.columns.len(),
            numeric_columns: raw.numerical_column.iter().cloned().collect(),
            categorical_columns: raw.categorical_column.iter().cloned().collect(),
            standard_scale_columns: raw.num_features,
            min_max_columns: raw.mm_columns,
            drop_columns: raw.drop_columns.into_set(),
            target_column: TARGET_COLUMN.to_string(),
        };

        if catalog.expected_column_count == 0 {
            return Err(PipelineError::schema("schema declares no columns"));
        }

        let overlap: Vec<_> = catalog
            .numeric_columns
            .intersection(&catalog.categorical_columns)
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(PipelineError::schema(format!(
                "columns declared both numerical and categorical: {overlap:?}"
            )));
        }

        for role in [
            &catalog.numeric_columns,
            &catalog.categorical_columns,
        ] {
            if role.contains(&catalog.target_column) {
                return Err(PipelineError::schema(format!(
                    "target column {} must not carry a feature role",
                    catalog.target_column
                )));
            }
        }

        for name in catalog
            .standard_scale_columns
            .iter()
            .chain(catalog.min_max_columns.iter())
        {
            if !catalog.numeric_columns.contains(name) {
                return Err(PipelineError::schema(format!(
                    "scaling column {name} is not declared in numerical_column"
                )));
            }
        }
        let mm: BTreeSet<_> = catalog.min_max_columns.iter().collect();
        if let Some(both) = catalog.standard_scale_columns.iter().find(|c| mm.contains(c)) {
            return Err(PipelineError::schema(format!(
                "column {both} declared in both num_features and mm_columns"
            )));
        }

        Ok(catalog)
    }

    pub fn expected_column_count(&self) -> usize {
        self.expected_column_count
    }

    pub fn numeric_columns(&self) -> &BTreeSet<String> {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &BTreeSet<String> {
        &self.categorical_columns
    }

    pub fn standard_scale_columns(&self) -> &[String] {
        &self.standard_scale_columns
    }

    pub fn min_max_columns(&self) -> &[String] {
        &self.min_max_columns
    }

    pub fn drop_columns(&self) -> &BTreeSet<String> {
        &self.drop_columns
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Whether `name` appears anywhere in the schema (any role or drop list).
    pub fn knows_column(&self, name: &str) -> bool {
        self.numeric_columns.contains(name)
            || self.categorical_columns.contains(name)
            || self.drop_columns.contains(name)
            || self.target_column == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawSchema {
        RawSchema {
            columns: vec![
                "Gender".into(),
                "Age".into(),
                "Vehicle_Age".into(),
                "Annual_Premium".into(),
                "Response".into(),
            ],
            numerical_column: vec!["Age".into(), "Annual_Premium".into()],
            categorical_column: vec!["Gender".into(), "Vehicle_Age".into()],
            num_features: vec!["Age".into()],
            mm_columns: vec!["Annual_Premium".into()],
            drop_columns: DropColumns::One("id".into()),
        }
    }

    #[test]
    fn test_catalog_from_valid_raw() {
        let catalog = SchemaCatalog::from_raw(raw()).unwrap();
        assert_eq!(catalog.expected_column_count(), 5);
        assert_eq!(catalog.target_column(), "Response");
        assert!(catalog.drop_columns().contains("id"));
        assert!(catalog.knows_column("id"));
        assert!(!catalog.knows_column("Vintage"));
    }

    #[test]
    fn test_rejects_role_overlap() {
        let mut r = raw();
        r.categorical_column.push("Age".into());
        let err = SchemaCatalog::from_raw(r).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_rejects_target_in_feature_role() {
        let mut r = raw();
        r.numerical_column.push("Response".into());
        assert!(SchemaCatalog::from_raw(r).is_err());
    }

    #[test]
    fn test_rejects_unknown_scaling_column() {
        let mut r = raw();
        r.mm_columns.push("Vintage".into());
        assert!(SchemaCatalog::from_raw(r).is_err());
    }

    #[test]
    fn test_rejects_column_in_both_scalers() {
        let mut r = raw();
        r.mm_columns.push("Age".into());
        assert!(SchemaCatalog::from_raw(r).is_err());
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            r#"
columns: [Gender, Age, Response]
numerical_column: [Age]
categorical_column: [Gender]
num_features: [Age]
mm_columns: []
drop_columns: id
"#,
        )
        .unwrap();
        let catalog = SchemaCatalog::load(&path).unwrap();
        assert_eq!(catalog.expected_column_count(), 3);
        assert_eq!(catalog.standard_scale_columns(), ["Age"]);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            r#"
columns: [Age, Response]
numerical_column: [Age]
categorical_column: []
num_features: []
mm_columns: []
target: Response
"#,
        )
        .unwrap();
        assert!(SchemaCatalog::load(&path).is_err());
    }
}
