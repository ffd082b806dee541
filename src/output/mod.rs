//! Output module
//!
//! Handles Arrow RecordBatch creation and local Parquet files.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Converting datasets to Arrow RecordBatches (declared or inferred schema)
//! - Writing Parquet files into the local output directory
//! - Reading Parquet files back into rows

mod schema;
mod writer;

pub use schema::{arrow_schema, batches_to_rows, dataset_to_batch};
pub use writer::{
    local_parquet_path, read_parquet, write_batch_to_parquet, write_local, ParquetWriter,
    ParquetWriterConfig,
};

#[cfg(test)]
mod tests;
