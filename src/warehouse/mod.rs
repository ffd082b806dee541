//! Warehouse module
//!
//! Loads published Parquet objects into warehouse tables and deduplicates
//! them.
//!
//! # Overview
//!
//! - [`Warehouse`] is the seam every engine implements
//! - [`BigQueryWarehouse`] submits jobs to Google BigQuery
//! - [`DuckDbWarehouse`] runs the same jobs against an embedded database
//! - [`WarehouseLoader`] appends one partition per call
//! - [`Deduplicator`] rewrites a table as its distinct rows

mod bigquery;
mod dedup;
mod embedded;
mod loader;
mod partition;
mod schemas;
mod types;

pub use bigquery::BigQueryWarehouse;
pub use dedup::{dedup_sql, DedupReport, Deduplicator};
pub use embedded::DuckDbWarehouse;
pub use loader::{LoadReport, WarehouseLoader};
pub use partition::{file_keys, month_keys, LoadTarget, PartitionKey, TargetTemplate};
pub use schemas::{album_schema, trip_schema};
pub use types::{
    FieldMode, FieldType, JobHandle, JobState, JobStatus, LoadRequest, QueryOptions, SchemaField,
    TableRef, TableSchema,
};

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// A warehouse that runs load and query jobs
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Engine name for logging
    fn kind(&self) -> &'static str;

    /// Quote a table reference for use in SQL
    fn quote_table(&self, table: &TableRef) -> String;

    /// Submit an append-load of a Parquet object
    async fn submit_load(&self, request: &LoadRequest) -> Result<JobHandle>;

    /// Submit a SQL statement
    async fn submit_query(&self, sql: &str, options: &QueryOptions) -> Result<JobHandle>;

    /// Current status of a job
    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus>;

    /// Number of rows in a table
    async fn row_count(&self, table: &TableRef) -> Result<u64>;
}

/// Poll a job until it is done
///
/// A finished job carrying an error becomes [`Error::WarehouseJob`];
/// exceeding `timeout` becomes [`Error::Timeout`].
pub async fn wait_for_job(
    warehouse: &dyn Warehouse,
    job: &JobHandle,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<JobStatus> {
    let started = Instant::now();
    loop {
        let status = warehouse.job_status(job).await?;
        debug!(job_id = %job.id, state = %status.state, "Polled job");

        if status.state.is_terminal() {
            return match status.error {
                Some(message) => Err(Error::warehouse_job(&job.id, message)),
                None => Ok(status),
            };
        }

        if started.elapsed() >= timeout {
            return Err(Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests;
