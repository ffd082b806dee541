//! Tests for the warehouse module

use super::*;
use crate::config::{AlbumsConfig, LocalConfig, TripsConfig};
use crate::normalize::TabularDataset;
use crate::output::write_local;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;

// ============================================================================
// Recording Warehouse
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Load { uri: String, table: String },
    Query(String),
}

/// Records submitted jobs; each job reports `polls_until_done` running states first
#[derive(Default)]
struct RecordingWarehouse {
    calls: Mutex<Vec<Call>>,
    polls: Mutex<u32>,
    polls_until_done: u32,
    fail_tables: Vec<String>,
    job_error: Option<String>,
}

impl RecordingWarehouse {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn quote_table(&self, table: &TableRef) -> String {
        format!("`{table}`")
    }

    async fn submit_load(&self, request: &LoadRequest) -> crate::error::Result<JobHandle> {
        if self.fail_tables.contains(&request.destination.table) {
            return Err(crate::error::Error::warehouse("rejected"));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call::Load {
            uri: request.source_uri.clone(),
            table: request.destination.to_string(),
        });
        Ok(JobHandle::new(format!("job_{}", calls.len())))
    }

    async fn submit_query(
        &self,
        sql: &str,
        _options: &QueryOptions,
    ) -> crate::error::Result<JobHandle> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call::Query(sql.to_string()));
        Ok(JobHandle::new(format!("job_{}", calls.len())))
    }

    async fn job_status(&self, _job: &JobHandle) -> crate::error::Result<JobStatus> {
        let mut polls = self.polls.lock().unwrap();
        *polls += 1;
        if *polls <= self.polls_until_done {
            return Ok(JobStatus::running());
        }
        *polls = 0;
        Ok(match &self.job_error {
            Some(message) => JobStatus::failed(message.clone()),
            None => JobStatus::done(),
        })
    }

    async fn row_count(&self, _table: &TableRef) -> crate::error::Result<u64> {
        Ok(42)
    }
}

fn albums_template() -> TargetTemplate {
    TargetTemplate::albums("dtc-de-2023", &AlbumsConfig::default())
}

fn fast_loader(warehouse: Arc<dyn Warehouse>) -> WarehouseLoader {
    WarehouseLoader::new(warehouse, albums_template())
        .with_polling(Duration::from_millis(1), Duration::from_secs(5))
}

// ============================================================================
// Partition Tests
// ============================================================================

#[test]
fn test_album_target_resolution() {
    let target = albums_template().resolve(&PartitionKey::File(3)).unwrap();
    assert_eq!(target.uri, "gs://prefect-gcs-bucket-bandcamp/albums-full-info-3");
    assert_eq!(target.table.to_string(), "dtc-de-2023.bandcamp.albums-full-info-3");
}

#[test]
fn test_trip_target_resolution_pads_month() {
    let template = TargetTemplate::trips("dtc-de-2023", &TripsConfig::default());
    let target = template.resolve(&PartitionKey::month(2019, 4).unwrap()).unwrap();
    assert_eq!(
        target.uri,
        "gs://prefect-gcs-bucket-bandcamp/data/fhv/fhv_tripdata_2019-04.parquet"
    );
    assert_eq!(target.table.table, "fhv_tripdata_2019_04");
    assert_eq!(target.table.dataset, "trips_data_all");
    assert_eq!(template.schema, trip_schema());
}

#[test_case(0 ; "zero")]
#[test_case(13 ; "thirteen")]
fn test_invalid_month_rejected(month: u32) {
    assert!(matches!(
        PartitionKey::month(2019, month),
        Err(crate::error::Error::InvalidPartition { .. })
    ));
    let template = TargetTemplate::trips("p", &TripsConfig::default());
    assert!(template.resolve(&PartitionKey::Month { year: 2019, month }).is_err());
}

#[test]
fn test_unknown_template_variable() {
    let mut template = albums_template();
    template.table = "albums-{{ nope }}".to_string();
    assert!(matches!(
        template.resolve(&PartitionKey::File(1)),
        Err(crate::error::Error::UndefinedVariable { .. })
    ));
}

#[test]
fn test_month_keys_follow_list_order() {
    let keys = month_keys(&[2019, 2020], &[4, 1]).unwrap();
    assert_eq!(
        keys,
        vec![
            PartitionKey::Month { year: 2019, month: 4 },
            PartitionKey::Month { year: 2019, month: 1 },
            PartitionKey::Month { year: 2020, month: 4 },
            PartitionKey::Month { year: 2020, month: 1 },
        ]
    );
    assert!(month_keys(&[2019], &[12, 13]).is_err());
    assert_eq!(file_keys(&[1, 2]), vec![PartitionKey::File(1), PartitionKey::File(2)]);
}

// ============================================================================
// Job Polling Tests
// ============================================================================

#[tokio::test]
async fn test_wait_for_job_polls_until_done() {
    let warehouse = RecordingWarehouse {
        polls_until_done: 3,
        ..Default::default()
    };
    let status = wait_for_job(
        &warehouse,
        &JobHandle::new("j"),
        Duration::from_millis(1),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(status.state, JobState::Done);
}

#[tokio::test]
async fn test_wait_for_job_error_result() {
    let warehouse = RecordingWarehouse {
        job_error: Some("schema mismatch".to_string()),
        ..Default::default()
    };
    let err = wait_for_job(
        &warehouse,
        &JobHandle::new("j1"),
        Duration::from_millis(1),
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    assert!(
        matches!(err, crate::error::Error::WarehouseJob { ref job_id, .. } if job_id == "j1")
    );
}

#[tokio::test]
async fn test_wait_for_job_timeout() {
    let warehouse = RecordingWarehouse {
        polls_until_done: u32::MAX,
        ..Default::default()
    };
    let err = wait_for_job(
        &warehouse,
        &JobHandle::new("j"),
        Duration::from_millis(1),
        Duration::from_millis(5),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, crate::error::Error::Timeout { .. }));
}

#[test_case("DONE", JobState::Done)]
#[test_case("pending", JobState::Pending)]
#[test_case("RUNNING", JobState::Running)]
#[test_case("SOMETHING", JobState::Running)]
fn test_job_state_parse(input: &str, expected: JobState) {
    assert_eq!(JobState::parse(input), expected);
}

// ============================================================================
// Loader / Dedup Tests (recording warehouse)
// ============================================================================

#[tokio::test]
async fn test_loads_run_in_order() {
    let warehouse = Arc::new(RecordingWarehouse {
        polls_until_done: 1,
        ..Default::default()
    });
    let loader = fast_loader(warehouse.clone());

    let mut reports = Vec::new();
    for key in file_keys(&[1, 2, 3]) {
        reports.push(loader.load_partition(&key).await.unwrap());
    }

    assert_eq!(
        warehouse.calls(),
        (1..=3)
            .map(|n| Call::Load {
                uri: format!("gs://prefect-gcs-bucket-bandcamp/albums-full-info-{n}"),
                table: format!("dtc-de-2023.bandcamp.albums-full-info-{n}"),
            })
            .collect::<Vec<_>>()
    );
    assert_eq!(reports[2].job_id, "job_3");
    assert_eq!(reports[2].rows, 42);
    assert_eq!(reports[0].key, PartitionKey::File(1));
}

#[tokio::test]
async fn test_load_job_error_is_fatal() {
    let warehouse = Arc::new(RecordingWarehouse {
        job_error: Some("bad parquet".to_string()),
        ..Default::default()
    });
    let err = fast_loader(warehouse)
        .load_partition(&PartitionKey::File(1))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::WarehouseJob { .. }));
}

#[test]
fn test_dedup_sql() {
    assert_eq!(
        dedup_sql("`p.d.t`"),
        "CREATE OR REPLACE TABLE `p.d.t` AS (SELECT DISTINCT * FROM `p.d.t`)"
    );
}

#[tokio::test]
async fn test_dedup_submits_distinct_query_and_waits() {
    let warehouse = Arc::new(RecordingWarehouse {
        polls_until_done: 2,
        ..Default::default()
    });
    let dedup = Deduplicator::new(warehouse.clone(), albums_template())
        .with_polling(Duration::from_millis(1), Duration::from_secs(5));

    let report = dedup.dedup(&PartitionKey::File(7)).await.unwrap();

    assert_eq!(
        warehouse.calls(),
        vec![Call::Query(
            "CREATE OR REPLACE TABLE `dtc-de-2023.bandcamp.albums-full-info-7` AS \
             (SELECT DISTINCT * FROM `dtc-de-2023.bandcamp.albums-full-info-7`)"
                .to_string()
        )]
    );
    assert_eq!(report.state, JobState::Done);
    assert_eq!(report.table.table, "albums-full-info-7");
}

// ============================================================================
// DuckDB Tests
// ============================================================================

fn write_album_file(dir: &Path, name: &str, records: &[serde_json::Value]) {
    let dataset = TabularDataset::from_records(name, records, "_");
    let config = LocalConfig {
        dir: dir.to_path_buf(),
        ..Default::default()
    };
    let path = write_local(&dataset, Path::new(&format!("{name}.json")), &config, Some(&album_schema()))
        .unwrap();
    // Object URIs carry no extension
    std::fs::rename(&path, dir.join(name)).unwrap();
}

fn duckdb_parts(root: &Path) -> (Arc<DuckDbWarehouse>, WarehouseLoader, Deduplicator) {
    let warehouse = Arc::new(DuckDbWarehouse::in_memory().unwrap().with_object_root(root));
    let loader = fast_loader(warehouse.clone());
    let dedup = Deduplicator::new(warehouse.clone(), albums_template())
        .with_polling(Duration::from_millis(1), Duration::from_secs(5));
    (warehouse, loader, dedup)
}

#[test]
fn test_duckdb_resolve_source() {
    let warehouse = DuckDbWarehouse::in_memory().unwrap().with_object_root("/data");
    assert_eq!(
        warehouse.resolve_source("gs://bucket/albums-full-info-1"),
        "/data/albums-full-info-1"
    );
    assert_eq!(warehouse.resolve_source("file:///tmp/x.parquet"), "/tmp/x.parquet");
    assert_eq!(warehouse.resolve_source("local.parquet"), "local.parquet");

    let plain = DuckDbWarehouse::in_memory().unwrap();
    assert_eq!(plain.resolve_source("gs://bucket/k"), "gs://bucket/k");
}

#[tokio::test]
async fn test_duckdb_load_appends_and_dedup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_album_file(
        dir.path(),
        "albums-full-info-1",
        &[
            json!({"_id": "a", "name": "One", "numTracks": 3}),
            json!({"_id": "a", "name": "One", "numTracks": 3}),
            json!({"_id": "b", "name": "Two", "byArtist": {"name": "Band"}}),
        ],
    );
    let (warehouse, loader, dedup) = duckdb_parts(dir.path());
    let key = PartitionKey::File(1);

    let first = loader.load_partition(&key).await.unwrap();
    assert_eq!(first.rows, 3);
    let second = loader.load_partition(&key).await.unwrap();
    assert_eq!(second.rows, 6);

    let report = dedup.dedup(&key).await.unwrap();
    assert_eq!(report.rows, 2);
    assert_eq!(report.state, JobState::Done);

    let again = dedup.dedup(&key).await.unwrap();
    assert_eq!(again.rows, 2);
    assert_eq!(warehouse.row_count(&report.table).await.unwrap(), 2);
}

#[tokio::test]
async fn test_duckdb_missing_object_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let (warehouse, loader, _) = duckdb_parts(dir.path());

    let err = loader.load_partition(&PartitionKey::File(9)).await.unwrap_err();
    assert!(matches!(err, crate::error::Error::WarehouseJob { .. }));

    // No destination table is left behind
    let table = TableRef::new("dtc-de-2023", "bandcamp", "albums-full-info-9");
    assert!(warehouse.row_count(&table).await.is_err());
}

#[tokio::test]
async fn test_duckdb_failed_insert_rolls_back_table() {
    let dir = tempfile::tempdir().unwrap();
    let trips_dir = dir.path().join("data/fhv");
    let dataset = TabularDataset::from_records(
        "trips",
        &[json!({"dispatching_base_num": "B00001", "pickup_datetime": "not a timestamp"})],
        "_",
    );
    let config = LocalConfig {
        dir: trips_dir,
        ..Default::default()
    };
    write_local(&dataset, Path::new("fhv_tripdata_2019-04.json"), &config, None).unwrap();

    let warehouse = Arc::new(DuckDbWarehouse::in_memory().unwrap().with_object_root(dir.path()));
    let loader = WarehouseLoader::new(
        warehouse.clone(),
        TargetTemplate::trips("dtc-de-2023", &TripsConfig::default()),
    )
    .with_polling(Duration::from_millis(1), Duration::from_secs(5));

    let key = PartitionKey::month(2019, 4).unwrap();
    let err = loader.load_partition(&key).await.unwrap_err();
    assert!(matches!(err, crate::error::Error::WarehouseJob { .. }));

    let table = TableRef::new("dtc-de-2023", "trips_data_all", "fhv_tripdata_2019_04");
    assert!(warehouse.row_count(&table).await.is_err());
}

#[tokio::test]
async fn test_duckdb_unknown_job() {
    let warehouse = DuckDbWarehouse::in_memory().unwrap();
    assert!(warehouse.job_status(&JobHandle::new("nope")).await.is_err());
    assert_eq!(warehouse.kind(), "duckdb");
    assert_eq!(
        warehouse.quote_table(&TableRef::new("p", "bandcamp", "albums-full-info-1")),
        "\"bandcamp\".\"albums-full-info-1\""
    );
}
