//! DuckDB-backed warehouse
//!
//! Runs load and query jobs against an embedded DuckDB database. Jobs execute
//! synchronously on submit and are recorded as done, with the error message
//! when they failed, so the polling contract matches a remote warehouse.

use super::types::{JobHandle, JobStatus, LoadRequest, QueryOptions, TableRef, TableSchema};
use super::Warehouse;
use crate::config::WarehouseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use duckdb::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Warehouse on an embedded DuckDB connection
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
    /// Local directory standing in for the bucket of `scheme://bucket/key` URIs
    object_root: Option<PathBuf>,
    jobs: Mutex<HashMap<String, JobStatus>>,
    next_job: AtomicU64,
}

impl DuckDbWarehouse {
    /// Open an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::warehouse(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self::from_connection(conn))
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::warehouse(format!("Failed to open DuckDB database {}: {e}", path.display()))
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Build from configuration
    pub fn from_config(config: &WarehouseConfig) -> Result<Self> {
        let warehouse = match &config.duckdb_path {
            Some(path) => Self::open(path)?,
            None => Self::in_memory()?,
        };
        Ok(match &config.object_root {
            Some(root) => warehouse.with_object_root(root),
            None => warehouse,
        })
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            object_root: None,
            jobs: Mutex::new(HashMap::new()),
            next_job: AtomicU64::new(1),
        }
    }

    /// Resolve object URIs below a local directory
    #[must_use]
    pub fn with_object_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.object_root = Some(root.into());
        self
    }

    /// Local path (or URL DuckDB reads directly) for a source URI
    ///
    /// With an object root, `gs://bucket/a/b.parquet` becomes `<root>/a/b.parquet`.
    /// `file://` URIs and plain paths are used as they are.
    pub fn resolve_source(&self, uri: &str) -> String {
        match uri.split_once("://") {
            Some(("file", path)) => path.to_string(),
            Some((_, rest)) => match &self.object_root {
                Some(root) => {
                    let key = rest.split_once('/').map_or("", |(_, key)| key);
                    root.join(key).to_string_lossy().into_owned()
                }
                None => uri.to_string(),
            },
            None => uri.to_string(),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::warehouse("DuckDB connection lock poisoned"))
    }

    fn record_job(&self, outcome: Result<()>) -> Result<JobHandle> {
        let id = format!("duckdb_job_{}", self.next_job.fetch_add(1, Ordering::Relaxed));
        let status = match outcome {
            Ok(()) => JobStatus::done(),
            Err(e) => JobStatus::failed(e.to_string()),
        };
        self.jobs
            .lock()
            .map_err(|_| Error::warehouse("DuckDB job table lock poisoned"))?
            .insert(id.clone(), status);
        Ok(JobHandle::new(id))
    }

    fn run_load(&self, request: &LoadRequest) -> Result<()> {
        let table = self.quote_table(&request.destination);
        let source = sql_literal(&self.resolve_source(&request.source_uri));
        let mut conn = self.conn()?;

        // Read the source before touching the destination
        let present = file_columns(&conn, &source)?;

        // DDL and insert commit together; dropping the transaction rolls back
        let tx = conn
            .transaction()
            .map_err(|e| Error::warehouse(format!("Failed to begin load into {table}: {e}")))?;
        tx.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}; CREATE TABLE IF NOT EXISTS {table} ({});",
            quote_ident(&request.destination.dataset),
            column_definitions(&request.schema),
        ))
        .map_err(|e| Error::warehouse(format!("Failed to create {table}: {e}")))?;

        let targets: Vec<String> = request.schema.names().map(quote_ident).collect();
        let projections: Vec<String> = request
            .schema
            .fields
            .iter()
            .map(|f| {
                if present.iter().any(|c| c == &f.name) {
                    format!(
                        "CAST({} AS {})",
                        quote_ident(&f.name),
                        f.field_type.duckdb_type()
                    )
                } else {
                    format!("CAST(NULL AS {})", f.field_type.duckdb_type())
                }
            })
            .collect();

        let sql = format!(
            "INSERT INTO {table} ({}) SELECT {} FROM read_parquet({source})",
            targets.join(", "),
            projections.join(", "),
        );
        debug!(sql = %sql, "Running DuckDB load");
        let rows = tx
            .execute(&sql, [])
            .map_err(|e| Error::warehouse(format!("Failed to load {source} into {table}: {e}")))?;
        tx.commit()
            .map_err(|e| Error::warehouse(format!("Failed to commit load into {table}: {e}")))?;
        info!(table = %table, rows, "Appended rows");
        Ok(())
    }

    fn run_query(&self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "Running DuckDB query");
        self.conn()?
            .execute_batch(sql)
            .map_err(|e| Error::warehouse(format!("Query failed: {e}")))
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    fn kind(&self) -> &'static str {
        "duckdb"
    }

    /// DuckDB has one catalog per database, so the project is not part of the name
    fn quote_table(&self, table: &TableRef) -> String {
        format!("{}.{}", quote_ident(&table.dataset), quote_ident(&table.table))
    }

    async fn submit_load(&self, request: &LoadRequest) -> Result<JobHandle> {
        let outcome = self.run_load(request);
        self.record_job(outcome)
    }

    async fn submit_query(&self, sql: &str, options: &QueryOptions) -> Result<JobHandle> {
        if let Some(limit) = options.maximum_bytes_billed {
            debug!(limit, "Byte limit has no effect on DuckDB");
        }
        let outcome = self.run_query(sql);
        self.record_job(outcome)
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus> {
        self.jobs
            .lock()
            .map_err(|_| Error::warehouse("DuckDB job table lock poisoned"))?
            .get(&job.id)
            .cloned()
            .ok_or_else(|| Error::warehouse(format!("Unknown job {}", job.id)))
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        let table = self.quote_table(table);
        let count: i64 = self
            .conn()?
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(|e| Error::warehouse(format!("Failed to count rows of {table}: {e}")))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

/// Column names present in a Parquet file
fn file_columns(conn: &Connection, source: &str) -> Result<Vec<String>> {
    let sql = format!("DESCRIBE SELECT * FROM read_parquet({source})");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| Error::warehouse(format!("Failed to read {source}: {e}")))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| Error::warehouse(format!("Failed to read {source}: {e}")))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::warehouse(format!("Failed to read {source}: {e}")))?;
    Ok(columns)
}

fn column_definitions(schema: &TableSchema) -> String {
    schema
        .fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), f.field_type.duckdb_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Double-quote an identifier
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
