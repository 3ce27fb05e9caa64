//! In-memory tabular data: named columns over loosely-typed rows, and the
//! numeric matrix the model layer consumes.

use crate::error::PipelineError;
use crate::persistence::atomic_write;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A table of rows × named columns. Row order is insertion order; it carries
/// no meaning once a dataset has been through the shuffled split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, PipelineError> {
        let width = columns.len();
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(PipelineError::data_access(format!(
                "ragged row {bad}: expected {width} cells, got {}",
                rows[bad].len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, cloned in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Drop a column if present. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Rename a column if present. Returns whether anything changed.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.as_str() == from) {
            Some(col) => {
                *col = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a column and return its values.
    pub fn take_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(
            self.rows
                .iter_mut()
                .map(|row| row.remove(idx))
                .collect(),
        )
    }

    /// Append a column; the value count must match the row count.
    pub fn append_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), PipelineError> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::transform(format!(
                "append column: {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Rewrite every cell of a column in place. No-op if the column is absent;
    /// returns whether the column was found.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<bool, PipelineError>
    where
        F: FnMut(&Value) -> Result<Value, PipelineError>,
    {
        let Some(idx) = self.column_index(name) else {
            return Ok(false);
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(true)
    }

    /// Build a new dataset from a subset of row indices.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Write the dataset as CSV (header + rows), atomically.
    pub fn to_csv(&self, path: &Path) -> Result<(), PipelineError> {
        let mut out = String::new();
        out.push_str(&self.columns.join(","));
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(render_cell).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        atomic_write(path, out.as_bytes())?;
        Ok(())
    }

    /// Read a CSV file, inferring integer, float and boolean cells.
    pub fn from_csv(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines();

        let columns: Vec<String> = lines
            .next()
            .ok_or_else(|| {
                PipelineError::data_access(format!("empty CSV file {}", path.display()))
            })?
            .split(',')
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();

        let mut rows = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<Value> = line
                .split(',')
                .map(|s| parse_cell(s.trim().trim_matches('"')))
                .collect();
            rows.push(row);
        }
        Self::new(columns, rows)
    }

    /// Lower every cell to `f64`, producing the matrix the model layer
    /// consumes. Fails on any cell that has no numeric reading.
    pub fn to_numeric(&self) -> Result<NumericFrame, PipelineError> {
        let mut data = Array2::<f64>::zeros((self.rows.len(), self.columns.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                data[[i, j]] = cell_to_f64(cell).ok_or_else(|| {
                    PipelineError::transform(format!(
                        "column {} row {i}: cannot convert {cell} to a number",
                        self.columns[j]
                    ))
                })?;
            }
        }
        Ok(NumericFrame {
            columns: self.columns.clone(),
            data,
        })
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_cell(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        return serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string()));
    }
    if text == "true" || text == "false" {
        return Value::Bool(text == "true");
    }
    Value::String(text.to_string())
}

/// Numeric reading of a cell, if it has one.
pub(crate) fn cell_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Named numeric matrix: the shape of data after feature engineering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericFrame {
    pub columns: Vec<String>,
    pub data: Array2<f64>,
}

impl NumericFrame {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.data.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["Age".into(), "Gender".into(), "Premium".into()],
            vec![
                vec![json!(44), json!("Male"), json!(2630.5)],
                vec![json!(31), json!("Female"), json!(1805.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![json!(1)]],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::DataAccess(_)));
    }

    #[test]
    fn test_drop_and_rename() {
        let mut ds = sample();
        assert!(ds.drop_column("Premium"));
        assert!(!ds.drop_column("Premium"));
        assert!(ds.rename_column("Gender", "Sex"));
        assert_eq!(ds.columns(), ["Age", "Sex"]);
        assert_eq!(ds.rows()[0].len(), 2);
    }

    #[test]
    fn test_take_column() {
        let mut ds = sample();
        let ages = ds.take_column("Age").unwrap();
        assert_eq!(ages, vec![json!(44), json!(31)]);
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.rows()[1], vec![json!("Female"), json!(1805.0)]);
    }

    #[test]
    fn test_csv_roundtrip_with_inference() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let ds = sample();
        ds.to_csv(&path).unwrap();
        let back = Dataset::from_csv(&path).unwrap();
        assert_eq!(back.columns(), ds.columns());
        assert_eq!(back.rows()[0][0], json!(44));
        assert_eq!(back.rows()[0][1], json!("Male"));
        assert_eq!(back.rows()[0][2], json!(2630.5));
    }

    #[test]
    fn test_csv_null_cells_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Null, json!(2)]],
        )
        .unwrap();
        ds.to_csv(&path).unwrap();
        let back = Dataset::from_csv(&path).unwrap();
        assert_eq!(back.rows()[0][0], Value::Null);
    }

    #[test]
    fn test_to_numeric() {
        let ds = Dataset::new(
            vec!["x".into(), "y".into()],
            vec![
                vec![json!(1), json!("2.5")],
                vec![json!(true), json!(4)],
            ],
        )
        .unwrap();
        let frame = ds.to_numeric().unwrap();
        assert_eq!(frame.data[[0, 1]], 2.5);
        assert_eq!(frame.data[[1, 0]], 1.0);
    }

    #[test]
    fn test_to_numeric_rejects_text() {
        let ds = sample();
        let err = ds.to_numeric().unwrap_err();
        assert!(matches!(err, PipelineError::Transform(_)));
    }

    #[test]
    fn test_select_rows() {
        let ds = sample();
        let picked = ds.select_rows(&[1]);
        assert_eq!(picked.row_count(), 1);
        assert_eq!(picked.rows()[0][1], json!("Female"));
    }
}
