//! In-memory tabular dataset

use super::flatten::flatten_record;
use crate::types::{JsonObject, JsonValue};
use std::collections::{BTreeSet, HashSet};

/// A flat table built from normalized records
///
/// `columns` is the union of the row keys in first-seen order. A row that
/// lacks a column simply has no entry for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularDataset {
    /// Dataset name (source file stem)
    pub name: String,

    /// Column names
    pub columns: Vec<String>,

    /// Rows keyed by column
    pub rows: Vec<JsonObject>,

    /// Columns holding canonical date-time strings
    pub timestamp_columns: BTreeSet<String>,
}

impl TabularDataset {
    /// Create an empty dataset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Flatten records into a dataset
    pub fn from_records(name: impl Into<String>, records: &[JsonValue], separator: &str) -> Self {
        let rows = records
            .iter()
            .map(|record| flatten_record(record, separator))
            .collect();
        Self::from_rows(name, rows)
    }

    /// Build a dataset from rows that are already flat
    pub fn from_rows(name: impl Into<String>, rows: Vec<JsonObject>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }

        Self {
            name: name.into(),
            columns,
            rows,
            timestamp_columns: BTreeSet::new(),
        }
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column exists
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Values of one column, `Null` where a row lacks it
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a JsonValue> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&JsonValue::Null))
    }

    /// Remove a column, returning whether it was present
    pub fn drop_column(&mut self, column: &str) -> bool {
        let Some(pos) = self.columns.iter().position(|c| c == column) else {
            return false;
        };
        self.columns.remove(pos);
        for row in &mut self.rows {
            row.shift_remove(column);
        }
        self.timestamp_columns.remove(column);
        true
    }

    /// Apply `f` to every cell of a column that exists in the row
    pub fn map_column(&mut self, column: &str, f: impl Fn(&JsonValue) -> JsonValue) {
        for row in &mut self.rows {
            if let Some(value) = row.get_mut(column) {
                *value = f(value);
            }
        }
    }
}
