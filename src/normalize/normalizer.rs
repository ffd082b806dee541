//! Record normalizer
//!
//! read → flatten → tweak, per source file.

use super::dataset::TabularDataset;
use super::dates::canonicalize;
use super::decoders::read_records;
use crate::config::NormalizeConfig;
use crate::error::Result;
use std::path::Path;
use tracing::{debug, info};

/// Per-dataset normalization settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeProfile {
    /// Separator joining nested key paths
    pub separator: String,

    /// Columns parsed into canonical date-times
    pub date_columns: Vec<String>,

    /// Columns removed when present
    pub drop_columns: Vec<String>,
}

impl NormalizeProfile {
    /// Profile for the Bandcamp album export
    pub fn albums() -> Self {
        Self::from(&NormalizeConfig::default())
    }

    /// Set the separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Replace the date columns
    pub fn with_date_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.date_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the drop columns
    pub fn with_drop_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for NormalizeProfile {
    fn default() -> Self {
        Self::albums()
    }
}

impl From<&NormalizeConfig> for NormalizeProfile {
    fn from(config: &NormalizeConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            date_columns: config.date_columns.clone(),
            drop_columns: config.drop_columns.clone(),
        }
    }
}

/// Canonicalize date columns and drop unwanted ones
///
/// Unparsable dates become `null`. Missing columns are skipped.
pub fn tweak_dataset(mut dataset: TabularDataset, profile: &NormalizeProfile) -> TabularDataset {
    for column in &profile.date_columns {
        if !dataset.has_column(column) {
            debug!(dataset = %dataset.name, column = %column, "Date column not present");
            continue;
        }
        dataset.map_column(column, canonicalize);
        dataset.timestamp_columns.insert(column.clone());
    }

    for column in &profile.drop_columns {
        if dataset.drop_column(column) {
            debug!(dataset = %dataset.name, column = %column, "Dropped column");
        }
    }

    info!(
        dataset = %dataset.name,
        rows = dataset.num_rows(),
        columns = dataset.num_columns(),
        "Normalized dataset"
    );
    dataset
}

/// Turns source files into tabular datasets
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    profile: NormalizeProfile,
}

impl RecordNormalizer {
    /// Create a normalizer for a profile
    pub fn new(profile: NormalizeProfile) -> Self {
        Self { profile }
    }

    /// The active profile
    pub fn profile(&self) -> &NormalizeProfile {
        &self.profile
    }

    /// Read, flatten and tweak one file
    ///
    /// The dataset is named after the file's base name up to its first `.`.
    pub fn normalize_file(&self, path: &Path) -> Result<TabularDataset> {
        let records = read_records(path)?;
        let name = dataset_stem(path);
        debug!(path = %path.display(), records = records.len(), "Read source file");

        let dataset = TabularDataset::from_records(name, &records, &self.profile.separator);
        Ok(tweak_dataset(dataset, &self.profile))
    }
}

/// Base name of a path up to its first `.`
pub fn dataset_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}
