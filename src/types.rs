//! Common types used throughout the pipeline
//!
//! Shared type definitions, type aliases and small enums used across
//! multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Output Compression
// ============================================================================

/// Compression codec for columnar output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCompression {
    /// No compression
    None,
    /// Snappy
    Snappy,
    /// GZIP (matches what the warehouse loader expects by default)
    #[default]
    Gzip,
    /// ZSTD
    Zstd,
}

impl From<OutputCompression> for parquet::basic::Compression {
    fn from(value: OutputCompression) -> Self {
        use parquet::basic::{Compression, GzipLevel, ZstdLevel};
        match value {
            OutputCompression::None => Compression::UNCOMPRESSED,
            OutputCompression::Snappy => Compression::SNAPPY,
            OutputCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            OutputCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

// ============================================================================
// Warehouse Engine
// ============================================================================

/// Which warehouse implementation to load into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseEngine {
    /// Google BigQuery
    #[default]
    Bigquery,
    /// Embedded DuckDB database (local runs)
    Duckdb,
}
