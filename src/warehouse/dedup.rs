//! Table deduplication
//!
//! Rewrites a table as the distinct set of its rows. Running it again on a
//! deduplicated table changes nothing.

use super::partition::{PartitionKey, TargetTemplate};
use super::types::{JobState, QueryOptions, TableRef};
use super::{wait_for_job, Warehouse};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Statement replacing a table with its distinct rows
pub fn dedup_sql(quoted_table: &str) -> String {
    format!("CREATE OR REPLACE TABLE {quoted_table} AS (SELECT DISTINCT * FROM {quoted_table})")
}

/// Outcome of one deduplication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupReport {
    pub table: TableRef,
    pub job_id: String,
    pub state: JobState,
    /// Row count after deduplication
    pub rows: u64,
}

/// Deduplicates partition tables
#[derive(Clone)]
pub struct Deduplicator {
    warehouse: Arc<dyn Warehouse>,
    template: TargetTemplate,
    options: QueryOptions,
    poll_interval: Duration,
    timeout: Duration,
}

impl Deduplicator {
    /// Create a deduplicator with the default byte ceiling (10^10)
    pub fn new(warehouse: Arc<dyn Warehouse>, template: TargetTemplate) -> Self {
        Self {
            warehouse,
            template,
            options: QueryOptions {
                maximum_bytes_billed: Some(10_u64.pow(10)),
            },
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(3600),
        }
    }

    /// Set the byte ceiling
    #[must_use]
    pub fn with_max_bytes_billed(mut self, limit: Option<u64>) -> Self {
        self.options.maximum_bytes_billed = limit;
        self
    }

    /// Set how jobs are polled
    #[must_use]
    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    /// Deduplicate the table of one partition
    pub async fn dedup(&self, key: &PartitionKey) -> Result<DedupReport> {
        let table = self.template.resolve(key)?.table;
        self.dedup_table(&table).await
    }

    /// Deduplicate a table and wait for the job to finish
    pub async fn dedup_table(&self, table: &TableRef) -> Result<DedupReport> {
        let sql = dedup_sql(&self.warehouse.quote_table(table));
        let job = self.warehouse.submit_query(&sql, &self.options).await?;
        info!(job_id = %job.id, table = %table, "Dedup job submitted");

        let status =
            wait_for_job(self.warehouse.as_ref(), &job, self.poll_interval, self.timeout).await?;
        let rows = self.warehouse.row_count(table).await?;
        info!(job_id = %job.id, state = %status.state, table = %table, rows, "Dedup finished");

        Ok(DedupReport {
            table: table.clone(),
            job_id: job.id,
            state: status.state,
            rows,
        })
    }
}
