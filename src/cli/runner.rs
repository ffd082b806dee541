//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{
    default_file_keys, default_month_keys, LoadParentFlow, PartitionOutcome, WebToStoreFlow,
    WebToStoreReport,
};
use crate::types::WarehouseEngine;
use crate::warehouse::{
    file_keys, BigQueryWarehouse, DedupReport, Deduplicator, DuckDbWarehouse, PartitionKey,
    TargetTemplate, Warehouse,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::WebToStore {
                url,
                store,
                local_dir,
            } => {
                self.web_to_store(config, url.as_deref(), store.as_deref(), local_dir.as_deref())
                    .await
            }
            Commands::LoadAlbums { files, dedup } => {
                let keys = match files {
                    Some(nums) => file_keys(nums),
                    None => default_file_keys(&config),
                };
                let template = TargetTemplate::albums(&config.warehouse.project, &config.albums);
                self.load_parent(&config, template, &keys, *dedup).await
            }
            Commands::LoadTrips {
                years,
                months,
                dedup,
            } => {
                let years = years.as_deref().unwrap_or(&config.trips.years[..]);
                let months = months.as_deref().unwrap_or(&config.trips.months[..]);
                let keys = default_month_keys(years, months)?;
                let template = TargetTemplate::trips(&config.warehouse.project, &config.trips);
                self.load_parent(&config, template, &keys, *dedup).await
            }
            Commands::Dedup { file } => self.dedup(&config, *file).await,
            Commands::ShowConfig => {
                print!("{}", config.to_yaml()?);
                Ok(())
            }
        }
    }

    /// Load the pipeline config, falling back to defaults
    ///
    /// A config file is validated while it is parsed.
    fn load_config(&self) -> Result<PipelineConfig> {
        match &self.cli.config {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                PipelineConfig::load(path)
            }
            None => {
                let config = PipelineConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Fetch, convert and upload the dataset
    async fn web_to_store(
        &self,
        mut config: PipelineConfig,
        url: Option<&str>,
        store: Option<&str>,
        local_dir: Option<&Path>,
    ) -> Result<()> {
        if let Some(store) = store {
            config.store.url = store.to_string();
        }
        if let Some(dir) = local_dir {
            config.local.dir = dir.to_path_buf();
        }
        let url = url.map_or_else(|| config.source.url.clone(), str::to_string);

        let flow = WebToStoreFlow::from_config(&config)?;
        let report = flow.run(&url).await?;
        self.output_message(&web_to_store_message(&report));

        if report.is_complete() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "{} of {} files failed",
                report.failed.len(),
                report.failed.len() + report.succeeded.len()
            )))
        }
    }

    /// Load a list of partitions
    async fn load_parent(
        &self,
        config: &PipelineConfig,
        template: TargetTemplate,
        keys: &[PartitionKey],
        dedup: bool,
    ) -> Result<()> {
        let warehouse = build_warehouse(config).await?;
        info!(
            engine = warehouse.kind(),
            partitions = keys.len(),
            dedup,
            "Starting load"
        );

        let flow = LoadParentFlow::from_config(warehouse, template, config, dedup);
        for outcome in flow.run(keys).await? {
            self.output_message(&partition_message(&outcome));
        }
        Ok(())
    }

    /// Deduplicate one album table
    async fn dedup(&self, config: &PipelineConfig, file: u32) -> Result<()> {
        let warehouse = build_warehouse(config).await?;
        let template = TargetTemplate::albums(&config.warehouse.project, &config.albums);
        let wh = &config.warehouse;

        let report = Deduplicator::new(warehouse, template)
            .with_max_bytes_billed(wh.max_bytes_billed)
            .with_polling(wh.poll_interval(), wh.job_timeout())
            .dedup(&PartitionKey::File(file))
            .await?;
        self.output_message(&dedup_message(&report));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Connect to the configured warehouse engine
pub async fn build_warehouse(config: &PipelineConfig) -> Result<Arc<dyn Warehouse>> {
    let warehouse: Arc<dyn Warehouse> = match config.warehouse.engine {
        WarehouseEngine::Bigquery => {
            Arc::new(BigQueryWarehouse::from_config(&config.warehouse).await?)
        }
        WarehouseEngine::Duckdb => Arc::new(DuckDbWarehouse::from_config(&config.warehouse)?),
    };
    Ok(warehouse)
}

// ============================================================================
// Report Messages
// ============================================================================

fn web_to_store_message(report: &WebToStoreReport) -> Value {
    let succeeded: Vec<Value> = report
        .succeeded
        .iter()
        .map(|file| {
            json!({
                "source": file.source.display().to_string(),
                "uri": file.remote.uri,
                "rows": file.rows
            })
        })
        .collect();
    let failed: Vec<Value> = report
        .failed
        .iter()
        .map(|file| {
            json!({
                "source": file.source.display().to_string(),
                "error": file.error
            })
        })
        .collect();

    json!({
        "type": "WEB_TO_STORE",
        "fetched": report.fetch.path.display().to_string(),
        "bytes": report.fetch.progress.downloaded(),
        "succeeded": succeeded,
        "failed": failed
    })
}

fn partition_message(outcome: &PartitionOutcome) -> Value {
    let load = &outcome.load;
    let mut msg = json!({
        "type": "LOAD",
        "partition": load.key.to_string(),
        "uri": load.target.uri,
        "table": load.target.table.to_string(),
        "job_id": load.job_id,
        "rows": load.rows
    });
    if let Some(dedup) = &outcome.dedup {
        msg["dedup"] = dedup_message(dedup);
    }
    msg
}

fn dedup_message(report: &DedupReport) -> Value {
    json!({
        "type": "DEDUP",
        "table": report.table.to_string(),
        "job_id": report.job_id,
        "state": report.state.as_str(),
        "rows": report.rows
    })
}
