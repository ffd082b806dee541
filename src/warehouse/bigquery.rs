//! BigQuery warehouse using gcp-bigquery-client

use super::types::{
    FieldType, JobHandle, JobState, JobStatus, LoadRequest, QueryOptions, TableRef,
    TableSchema,
};
use super::Warehouse;
use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use gcp_bigquery_client::model::job::Job;
use gcp_bigquery_client::model::job_configuration::JobConfiguration;
use gcp_bigquery_client::model::job_configuration_load::JobConfigurationLoad;
use gcp_bigquery_client::model::job_configuration_query::JobConfigurationQuery;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_reference::TableReference;
use gcp_bigquery_client::model::table_schema::TableSchema as BqTableSchema;
use gcp_bigquery_client::Client;
use std::path::Path;
use tracing::info;

/// Google BigQuery warehouse
pub struct BigQueryWarehouse {
    client: Client,
    project: String,
    location: Option<String>,
}

impl BigQueryWarehouse {
    /// Wrap an existing client
    pub fn new(client: Client, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
            location: None,
        }
    }

    /// Connect with a service-account key file
    pub async fn from_key_file(path: &Path, project: impl Into<String>) -> Result<Self> {
        let path_str = path.to_string_lossy();
        let client = Client::from_service_account_key_file(&path_str)
            .await
            .map_err(|e| Error::warehouse(format!("Failed to create BigQuery client: {e}")))?;
        Ok(Self::new(client, project))
    }

    /// Connect with application default credentials
    pub async fn from_application_default(project: impl Into<String>) -> Result<Self> {
        let client = Client::from_application_default_credentials()
            .await
            .map_err(|e| Error::warehouse(format!("Failed to create BigQuery client: {e}")))?;
        Ok(Self::new(client, project))
    }

    /// Connect as configured
    pub async fn from_config(config: &WarehouseConfig) -> Result<Self> {
        let warehouse = match &config.credentials_path {
            Some(path) => Self::from_key_file(path, &config.project).await?,
            None => Self::from_application_default(&config.project).await?,
        };
        Ok(match &config.location {
            Some(location) => warehouse.with_location(location),
            None => warehouse,
        })
    }

    /// Set the job location
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    async fn insert_job(&self, project: &str, configuration: JobConfiguration) -> Result<JobHandle> {
        let job = Job {
            configuration: Some(configuration),
            ..Default::default()
        };
        let inserted = self
            .client
            .job()
            .insert(project, job)
            .await
            .map_err(|e| Error::warehouse(format!("Failed to submit job: {e}")))?;

        let reference = inserted
            .job_reference
            .ok_or_else(|| Error::warehouse("Submitted job has no reference"))?;
        let id = reference
            .job_id
            .ok_or_else(|| Error::warehouse("Submitted job has no id"))?;

        let handle = JobHandle::new(id);
        Ok(match reference.location.or_else(|| self.location.clone()) {
            Some(location) => handle.with_location(location),
            None => handle,
        })
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn kind(&self) -> &'static str {
        "bigquery"
    }

    fn quote_table(&self, table: &TableRef) -> String {
        format!("`{}`", table.to_string().replace('`', "\\`"))
    }

    async fn submit_load(&self, request: &LoadRequest) -> Result<JobHandle> {
        let dest = &request.destination;
        let load = JobConfigurationLoad {
            source_uris: Some(vec![request.source_uri.clone()]),
            destination_table: Some(TableReference::new(
                &dest.project,
                &dest.dataset,
                &dest.table,
            )),
            schema: Some(to_bq_schema(&request.schema)),
            source_format: Some("PARQUET".to_string()),
            write_disposition: Some("WRITE_APPEND".to_string()),
            ..Default::default()
        };
        let configuration = JobConfiguration {
            load: Some(load),
            ..Default::default()
        };

        let handle = self.insert_job(&dest.project, configuration).await?;
        info!(job_id = %handle.id, table = %dest, uri = %request.source_uri, "Submitted load job");
        Ok(handle)
    }

    async fn submit_query(&self, sql: &str, options: &QueryOptions) -> Result<JobHandle> {
        let query = JobConfigurationQuery {
            query: sql.to_string(),
            use_legacy_sql: Some(false),
            maximum_bytes_billed: options.maximum_bytes_billed.map(|b| b.to_string()),
            ..Default::default()
        };
        let configuration = JobConfiguration {
            query: Some(query),
            ..Default::default()
        };

        let handle = self.insert_job(&self.project, configuration).await?;
        info!(job_id = %handle.id, "Submitted query job");
        Ok(handle)
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus> {
        let remote = self
            .client
            .job()
            .get_job(&self.project, &job.id, job.location.as_deref())
            .await
            .map_err(|e| Error::warehouse(format!("Failed to get job {}: {e}", job.id)))?;

        let Some(status) = remote.status else {
            return Ok(JobStatus::running());
        };
        let state = status
            .state
            .as_deref()
            .map_or(JobState::Running, JobState::parse);
        let error = status
            .error_result
            .map(|e| e.message.unwrap_or_else(|| "unknown error".to_string()));

        Ok(JobStatus { state, error })
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        let remote = self
            .client
            .table()
            .get(&table.project, &table.dataset, &table.table, None)
            .await
            .map_err(|e| Error::warehouse(format!("Failed to get table {table}: {e}")))?;

        remote
            .num_rows
            .as_deref()
            .unwrap_or("0")
            .parse()
            .map_err(|e| Error::warehouse(format!("Invalid row count for {table}: {e}")))
    }
}

/// BigQuery schema equivalent of a declared schema
fn to_bq_schema(schema: &TableSchema) -> BqTableSchema {
    let fields = schema
        .fields
        .iter()
        .map(|f| {
            let mut field = match f.field_type {
                FieldType::String => TableFieldSchema::string(&f.name),
                FieldType::Float => TableFieldSchema::float(&f.name),
                FieldType::Integer => TableFieldSchema::integer(&f.name),
                FieldType::Boolean => TableFieldSchema::bool(&f.name),
                FieldType::Timestamp => TableFieldSchema::timestamp(&f.name),
            };
            field.mode = Some(f.mode.as_str().to_string());
            field
        })
        .collect();
    BqTableSchema::new(fields)
}
