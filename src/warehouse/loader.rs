//! Warehouse loader
//!
//! Appends one partition's Parquet object to its warehouse table. Loads are
//! append-only: loading a partition twice duplicates its rows until the
//! table is deduplicated.

use super::partition::{LoadTarget, PartitionKey, TargetTemplate};
use super::types::LoadRequest;
use super::{wait_for_job, Warehouse};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Outcome of one partition load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub key: PartitionKey,
    pub target: LoadTarget,
    pub job_id: String,
    /// Table row count after the load
    pub rows: u64,
}

/// Loads partitions into a warehouse
#[derive(Clone)]
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
    template: TargetTemplate,
    poll_interval: Duration,
    timeout: Duration,
}

impl WarehouseLoader {
    /// Create a loader for a target family
    pub fn new(warehouse: Arc<dyn Warehouse>, template: TargetTemplate) -> Self {
        Self {
            warehouse,
            template,
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(3600),
        }
    }

    /// Set how jobs are polled
    #[must_use]
    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    pub fn template(&self) -> &TargetTemplate {
        &self.template
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    /// Append one partition and wait for the job to finish
    pub async fn load_partition(&self, key: &PartitionKey) -> Result<LoadReport> {
        let target = self.template.resolve(key)?;
        let request = LoadRequest {
            source_uri: target.uri.clone(),
            destination: target.table.clone(),
            schema: self.template.schema.clone(),
        };

        let job = self.warehouse.submit_load(&request).await?;
        info!(
            partition = %key,
            job_id = %job.id,
            uri = %target.uri,
            table = %target.table,
            "Load job submitted"
        );

        wait_for_job(self.warehouse.as_ref(), &job, self.poll_interval, self.timeout).await?;

        let rows = self.warehouse.row_count(&target.table).await?;
        info!(partition = %key, table = %target.table, rows, "Loaded partition");

        Ok(LoadReport {
            key: *key,
            target,
            job_id: job.id,
            rows,
        })
    }
}
