//! Pipeline configuration
//!
//! All settings live in one YAML document. Every section and field has a
//! default, so an empty file (or no file at all) reproduces the stock
//! Bandcamp run: the fixed dataset URL, files 1 through 11 and the
//! 2019/2020 trip months.

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::{BackoffType, OutputCompression, WarehouseEngine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dataset archive downloaded by the web-to-store flow
pub const DEFAULT_DATASET_URL: &str =
    "https://www.dropbox.com/s/a1kl5e35j4o53mz/bandcamp-items-json.zip?dl=1";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where the dataset comes from
    pub source: SourceConfig,

    /// How records are flattened and cleaned
    pub normalize: NormalizeConfig,

    /// Local intermediate Parquet files
    pub local: LocalConfig,

    /// Object store destination
    pub store: StoreConfig,

    /// Warehouse connection
    pub warehouse: WarehouseConfig,

    /// Album (item) load targets
    pub albums: AlbumsConfig,

    /// Trip load targets
    pub trips: TripsConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(Error::config("source.url must not be empty"));
        }
        if self.normalize.separator.is_empty() {
            return Err(Error::config("normalize.separator must not be empty"));
        }
        if self.store.url.trim().is_empty() {
            return Err(Error::config("store.url must not be empty"));
        }
        if let Some(month) = self.trips.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(Error::config(format!(
                "trips.months contains {month}, expected 1-12"
            )));
        }
        if self.warehouse.poll_interval_ms == 0 {
            return Err(Error::config("warehouse.poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Source
// ============================================================================

/// Dataset download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Archive or file URL
    pub url: String,

    /// Directory the download (and extraction) lands in
    pub download_dir: PathBuf,

    /// Whole-download retries
    pub max_retries: u32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATASET_URL.to_string(),
            download_dir: PathBuf::from("."),
            max_retries: 3,
            timeout_secs: 600,
        }
    }
}

impl SourceConfig {
    /// Retry policy for the download step
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_type: BackoffType::Exponential,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// Normalize
// ============================================================================

/// Flattening and cleanup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Separator joining nested key paths
    pub separator: String,

    /// Columns parsed into canonical date-times
    pub date_columns: Vec<String>,

    /// Columns removed when present
    pub drop_columns: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            separator: "_".to_string(),
            date_columns: vec!["datePublished".to_string(), "dateModified".to_string()],
            drop_columns: vec![
                "@context".to_string(),
                "@type".to_string(),
                "@id".to_string(),
                "image".to_string(),
            ],
        }
    }
}

// ============================================================================
// Local Output
// ============================================================================

/// Local Parquet output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory for intermediate files; also the object key prefix
    pub dir: PathBuf,

    /// Parquet compression codec
    pub compression: OutputCompression,

    /// Conform each dataset to the album warehouse schema before writing
    pub conform_to_schema: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("bandcamp"),
            compression: OutputCompression::Gzip,
            conform_to_schema: true,
        }
    }
}

// ============================================================================
// Object Store
// ============================================================================

/// Object store destination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Destination URL (`gs://bucket`, `s3://bucket/prefix`, local path, ...)
    pub url: String,

    /// Upload retries after the first attempt
    pub max_retries: u32,

    /// Fixed delay between upload attempts, in seconds
    pub retry_delay_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "gs://prefect-gcs-bucket-bandcamp".to_string(),
            max_retries: 3,
            retry_delay_secs: 10,
        }
    }
}

impl StoreConfig {
    /// Retry policy for the upload step
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, Duration::from_secs(self.retry_delay_secs))
    }
}

// ============================================================================
// Warehouse
// ============================================================================

/// Warehouse connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Which engine to use
    pub engine: WarehouseEngine,

    /// Project that owns jobs and tables
    pub project: String,

    /// Job location (e.g. `US`, `europe-west6`)
    pub location: Option<String>,

    /// Service account key file; application default credentials when absent
    pub credentials_path: Option<PathBuf>,

    /// DuckDB database file; in-memory when absent
    pub duckdb_path: Option<PathBuf>,

    /// Local directory that stands in for the bucket when loading into DuckDB
    pub object_root: Option<PathBuf>,

    /// Safety cap for query jobs
    pub max_bytes_billed: Option<u64>,

    /// Delay between job state polls
    pub poll_interval_ms: u64,

    /// Give up waiting for a job after this many seconds
    pub job_timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            engine: WarehouseEngine::Bigquery,
            project: "dtc-de-2023".to_string(),
            location: None,
            credentials_path: None,
            duckdb_path: None,
            object_root: None,
            max_bytes_billed: Some(10_u64.pow(10)),
            poll_interval_ms: 1000,
            job_timeout_secs: 3600,
        }
    }
}

impl WarehouseConfig {
    /// Delay between job state polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Maximum time to wait for one job
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

// ============================================================================
// Load Targets
// ============================================================================

/// Album load targets, keyed by file number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumsConfig {
    /// Warehouse dataset holding the tables
    pub dataset: String,

    /// Bucket the Parquet files were published to
    pub bucket: String,

    /// Source object URI template
    pub uri: String,

    /// Destination table name template
    pub table: String,

    /// Default file numbers for the load-parent flow
    pub file_nums: Vec<u32>,
}

impl Default for AlbumsConfig {
    fn default() -> Self {
        Self {
            dataset: "bandcamp".to_string(),
            bucket: "prefect-gcs-bucket-bandcamp".to_string(),
            uri: "gs://{{ bucket }}/albums-full-info-{{ num }}".to_string(),
            table: "albums-full-info-{{ num }}".to_string(),
            file_nums: (1..=11).collect(),
        }
    }
}

/// Trip load targets, keyed by year and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripsConfig {
    /// Warehouse dataset holding the tables
    pub dataset: String,

    /// Bucket holding the monthly trip files
    pub bucket: String,

    /// Source object URI template
    pub uri: String,

    /// Destination table name template
    pub table: String,

    /// Default years
    pub years: Vec<i32>,

    /// Default months
    pub months: Vec<u32>,
}

impl Default for TripsConfig {
    fn default() -> Self {
        Self {
            dataset: "trips_data_all".to_string(),
            bucket: "prefect-gcs-bucket-bandcamp".to_string(),
            uri: "gs://{{ bucket }}/data/fhv/fhv_tripdata_{{ year }}-{{ month }}.parquet"
                .to_string(),
            table: "fhv_tripdata_{{ year }}_{{ month }}".to_string(),
            years: vec![2019, 2020],
            months: vec![4, 5, 6, 7, 8, 9, 10, 11, 12, 2, 3, 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.source.url, DEFAULT_DATASET_URL);
        assert_eq!(config.local.dir, PathBuf::from("bandcamp"));
        assert_eq!(config.local.compression, OutputCompression::Gzip);
        assert_eq!(config.store.max_retries, 3);
        assert_eq!(config.albums.file_nums, (1..=11).collect::<Vec<_>>());
        assert_eq!(config.warehouse.max_bytes_billed, Some(10_000_000_000));
        assert_eq!(config.trips.months.len(), 12);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = PipelineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r"
store:
  url: memory://bucket
  retry_delay_secs: 0
warehouse:
  engine: duckdb
albums:
  file_nums: [1, 2, 3]
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.store.url, "memory://bucket");
        assert_eq!(config.store.max_retries, 3);
        assert_eq!(config.warehouse.engine, WarehouseEngine::Duckdb);
        assert_eq!(config.warehouse.project, "dtc-de-2023");
        assert_eq!(config.albums.file_nums, vec![1, 2, 3]);
        assert_eq!(config.albums.dataset, "bandcamp");
    }

    #[test]
    fn test_invalid_month_rejected() {
        let yaml = "trips:\n  months: [1, 13]\n";
        let err = PipelineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("13"));
    }

    #[test]
    fn test_empty_separator_rejected() {
        let yaml = "normalize:\n  separator: ''\n";
        assert!(PipelineConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PipelineConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_store_retry_policy_is_fixed() {
        let policy = StoreConfig::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(0), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        fs::write(&path, "source:\n  url: https://example.com/data.json\n").unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.source.url, "https://example.com/data.json");

        let missing = PipelineConfig::load(dir.path().join("missing.yaml"));
        assert!(missing.is_err());
    }
}
