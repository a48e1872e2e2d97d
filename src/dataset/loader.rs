//! Labeled dataset loader on top of [`Table`].

use std::path::Path;

use super::table::{Cell, ColumnKind, CsvOptions, Table};
use crate::Error;

/// Which column is the label and which columns are features.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetSchema {
    pub label_column: String,
    /// Explicit feature columns; empty selects every numeric non-label column.
    pub feature_columns: Vec<String>,
}

/// Feature matrix and label vector extracted from a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature column names, in vector order.
    pub feature_names: Vec<String>,
    pub label_column: String,
    /// One row per record; `None` marks a missing value.
    pub features: Vec<Vec<Option<f64>>>,
    /// `None` marks a missing label.
    pub labels: Vec<Option<String>>,
}

impl Dataset {
    /// Extract features and labels, validating the schema against the table.
    pub fn from_table(table: &Table, schema: &DatasetSchema) -> Result<Self, Error> {
        let label_idx = table.column_index(&schema.label_column).ok_or_else(|| {
            Error::SchemaMismatch(format!(
                "label column '{}' not found (columns: {})",
                schema.label_column,
                table.headers().join(", ")
            ))
        })?;
        let feature_idx = resolve_features(table, schema, label_idx)?;
        if feature_idx.is_empty() {
            return Err(Error::SchemaMismatch(
                "no numeric feature columns besides the label".to_string(),
            ));
        }

        let features = table
            .rows()
            .iter()
            .map(|row| {
                feature_idx
                    .iter()
                    .map(|&idx| row[idx].as_number())
                    .collect()
            })
            .collect();
        let labels = table
            .rows()
            .iter()
            .map(|row| match &row[label_idx] {
                Cell::Missing => None,
                cell => cell.as_text(),
            })
            .collect();
        Ok(Self {
            feature_names: feature_idx
                .iter()
                .map(|&idx| table.headers()[idx].clone())
                .collect(),
            label_column: schema.label_column.clone(),
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Read `path` and extract the labeled dataset described by `schema`.
pub fn load_dataset(
    path: &Path,
    schema: &DatasetSchema,
    options: &CsvOptions,
) -> Result<Dataset, Error> {
    let table = Table::from_path(path, options)?;
    let dataset = Dataset::from_table(&table, schema)?;
    tracing::info!(
        "Loaded {} rows with {} features from {}",
        dataset.len(),
        dataset.feature_names.len(),
        path.display()
    );
    Ok(dataset)
}

fn resolve_features(
    table: &Table,
    schema: &DatasetSchema,
    label_idx: usize,
) -> Result<Vec<usize>, Error> {
    if schema.feature_columns.is_empty() {
        let mut picked = Vec::new();
        for idx in (0..table.column_count()).filter(|&idx| idx != label_idx) {
            match table.column_kind(idx) {
                ColumnKind::Numeric => picked.push(idx),
                ColumnKind::Categorical => tracing::warn!(
                    "Skipping non-numeric column '{}'",
                    table.headers()[idx]
                ),
            }
        }
        return Ok(picked);
    }

    let mut picked = Vec::with_capacity(schema.feature_columns.len());
    for name in &schema.feature_columns {
        let idx = table
            .column_index(name)
            .ok_or_else(|| Error::SchemaMismatch(format!("feature column '{name}' not found")))?;
        if idx == label_idx {
            return Err(Error::SchemaMismatch(format!(
                "column '{name}' cannot be both label and feature"
            )));
        }
        if table.column_kind(idx) != ColumnKind::Numeric {
            return Err(Error::SchemaMismatch(format!(
                "feature column '{name}' is not numeric"
            )));
        }
        picked.push(idx);
    }
    Ok(picked)
}
