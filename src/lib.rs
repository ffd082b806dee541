// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Bandcamp ETL
//!
//! A batch pipeline that moves the public Bandcamp items dataset from the
//! web into a cloud data warehouse.
//!
//! ## Features
//!
//! - **Fetch**: Download a zip archive (or single file) with retries and extract it
//! - **Normalize**: Flatten nested JSON records into columns, canonicalize dates
//! - **Parquet Output**: Conform to the warehouse schema and write compressed Parquet
//! - **Object Store**: Upload to GCS, S3, R2, Azure or a local directory
//! - **Warehouse Load**: Append Parquet objects to BigQuery (or embedded DuckDB)
//! - **Dedup**: Rewrite a table to its distinct rows, blocking until done
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bandcamp_etl::{PipelineConfig, Result, WebToStoreFlow};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::load("pipeline.yaml")?;
//!
//!     let flow = WebToStoreFlow::from_config(&config)?;
//!     let report = flow.run(&config.source.url).await?;
//!     println!("published {} files", report.succeeded.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  web-to-store:  fetch → normalize → write → publish → cleanup    │
//! │  load-parent:   for key in keys { load → wait → (dedup) }        │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌───────────┬────────────┬──────┴──────┬─────────────┬─────────────┐
//! │   Fetch   │ Normalize  │   Output    │   Storage   │  Warehouse  │
//! ├───────────┼────────────┼─────────────┼─────────────┼─────────────┤
//! │ HTTP GET  │ JSON/JSONL │ Arrow       │ GCS / S3    │ BigQuery    │
//! │ Retry     │ Flatten    │ Parquet     │ R2 / Azure  │ DuckDB      │
//! │ Progress  │ Dates      │ Schema      │ Local       │ Job polling │
//! │ Unzip     │ Drops      │ conform     │ Cleanup     │ Dedup       │
//! └───────────┴────────────┴─────────────┴─────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// Retry policies for whole-operation retries
pub mod retry;

/// Pipeline configuration
pub mod config;

/// Template interpolation
pub mod template;

/// HTTP client with retry and backoff
pub mod http;

/// Dataset download and archive extraction
pub mod fetch;

/// JSON flattening and dataset tweaks
pub mod normalize;

/// Arrow/Parquet output
pub mod output;

/// Object store upload and local cleanup
pub mod storage;

/// Warehouse loads, job polling and deduplication
pub mod warehouse;

/// Pipeline flows
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use pipeline::{LoadParentFlow, WebToStoreFlow};
pub use warehouse::{PartitionKey, Warehouse};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
