//! Partition keys and load targets
//!
//! A partition key names one unit of loading: an album file number or a
//! trip month. A [`TargetTemplate`] renders it into the source object URI
//! and the destination table.

use super::types::{TableRef, TableSchema};
use super::schemas::{album_schema, trip_schema};
use crate::config::{AlbumsConfig, TripsConfig};
use crate::error::{Error, Result};
use crate::template::{render, TemplateContext};
use std::fmt;

/// One unit of warehouse loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    /// Album file number
    File(u32),
    /// Trip month
    Month { year: i32, month: u32 },
}

impl PartitionKey {
    /// A month key, validating the month
    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::invalid_partition(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        Ok(Self::Month { year, month })
    }

    fn context(&self) -> TemplateContext {
        match self {
            Self::File(num) => TemplateContext::new().with("num", num),
            Self::Month { year, month } => TemplateContext::new()
                .with("year", year)
                .with("month", format!("{month:02}")),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(num) => write!(f, "file {num}"),
            Self::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

/// Where one partition loads from and into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    /// Source object URI
    pub uri: String,

    /// Destination table
    pub table: TableRef,
}

/// URI and table patterns for a family of partitions
///
/// Templates may reference `num`, `year`, `month` (zero-padded), `project`,
/// `dataset` and `bucket`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTemplate {
    pub project: String,
    pub dataset: String,
    pub bucket: String,
    pub uri: String,
    pub table: String,
    /// Declared schema of every destination table
    pub schema: TableSchema,
}

impl TargetTemplate {
    /// Album targets: `albums-full-info-N`
    pub fn albums(project: &str, config: &AlbumsConfig) -> Self {
        Self {
            project: project.to_string(),
            dataset: config.dataset.clone(),
            bucket: config.bucket.clone(),
            uri: config.uri.clone(),
            table: config.table.clone(),
            schema: album_schema(),
        }
    }

    /// Trip targets: `fhv_tripdata_YYYY_MM`
    pub fn trips(project: &str, config: &TripsConfig) -> Self {
        Self {
            project: project.to_string(),
            dataset: config.dataset.clone(),
            bucket: config.bucket.clone(),
            uri: config.uri.clone(),
            table: config.table.clone(),
            schema: trip_schema(),
        }
    }

    /// Render the target of one partition
    pub fn resolve(&self, key: &PartitionKey) -> Result<LoadTarget> {
        if let PartitionKey::Month { month, .. } = key {
            if !(1..=12).contains(month) {
                return Err(Error::invalid_partition(format!(
                    "month must be between 1 and 12, got {month}"
                )));
            }
        }

        let ctx = key
            .context()
            .with("project", &self.project)
            .with("dataset", &self.dataset)
            .with("bucket", &self.bucket);

        Ok(LoadTarget {
            uri: render(&self.uri, &ctx)?,
            table: TableRef::new(&self.project, &self.dataset, render(&self.table, &ctx)?),
        })
    }
}

/// Month keys for every `year × month`, in list order
pub fn month_keys(years: &[i32], months: &[u32]) -> Result<Vec<PartitionKey>> {
    years
        .iter()
        .flat_map(|&year| months.iter().map(move |&month| PartitionKey::month(year, month)))
        .collect()
}

/// File keys for album file numbers
pub fn file_keys(nums: &[u32]) -> Vec<PartitionKey> {
    nums.iter().copied().map(PartitionKey::File).collect()
}
