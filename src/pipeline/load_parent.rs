//! Load-parent flow
//!
//! Loads a list of partitions sequentially, in list order. The first
//! failing partition aborts the rest.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::warehouse::{
    file_keys, month_keys, DedupReport, Deduplicator, LoadReport, PartitionKey, TargetTemplate,
    Warehouse, WarehouseLoader,
};
use std::sync::Arc;
use tracing::info;

/// Result of one partition in a parent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutcome {
    pub load: LoadReport,
    /// Present when dedup runs after each load
    pub dedup: Option<DedupReport>,
}

/// Album file keys from configuration (1..=11 by default)
pub fn default_file_keys(config: &PipelineConfig) -> Vec<PartitionKey> {
    file_keys(&config.albums.file_nums)
}

/// Trip month keys for every configured year and month
pub fn default_month_keys(years: &[i32], months: &[u32]) -> Result<Vec<PartitionKey>> {
    month_keys(years, months)
}

/// Runs the loader once per partition key
pub struct LoadParentFlow {
    loader: WarehouseLoader,
    dedup: Option<Deduplicator>,
}

impl LoadParentFlow {
    /// Create a flow that only loads
    pub fn new(loader: WarehouseLoader) -> Self {
        Self {
            loader,
            dedup: None,
        }
    }

    /// Build a flow for one target family from configuration
    pub fn from_config(
        warehouse: Arc<dyn Warehouse>,
        template: TargetTemplate,
        config: &PipelineConfig,
        dedup_after_load: bool,
    ) -> Self {
        let wh = &config.warehouse;
        let loader = WarehouseLoader::new(Arc::clone(&warehouse), template.clone())
            .with_polling(wh.poll_interval(), wh.job_timeout());
        let flow = Self::new(loader);
        if dedup_after_load {
            flow.with_dedup(
                Deduplicator::new(warehouse, template)
                    .with_max_bytes_billed(wh.max_bytes_billed)
                    .with_polling(wh.poll_interval(), wh.job_timeout()),
            )
        } else {
            flow
        }
    }

    /// Deduplicate each table right after loading it
    #[must_use]
    pub fn with_dedup(mut self, dedup: Deduplicator) -> Self {
        self.dedup = Some(dedup);
        self
    }

    /// Load every key in order
    pub async fn run(&self, keys: &[PartitionKey]) -> Result<Vec<PartitionOutcome>> {
        let mut outcomes = Vec::with_capacity(keys.len());
        for key in keys {
            let load = self.loader.load_partition(key).await?;
            let dedup = match &self.dedup {
                Some(dedup) => Some(dedup.dedup(key).await?),
                None => None,
            };
            outcomes.push(PartitionOutcome { load, dedup });
        }

        info!(partitions = outcomes.len(), "Load parent finished");
        Ok(outcomes)
    }
}
