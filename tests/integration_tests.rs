//! Integration tests using a mock HTTP server
//!
//! Tests the full end-to-end flow: zip archive → Parquet objects → warehouse tables

use bandcamp_etl::config::PipelineConfig;
use bandcamp_etl::pipeline::{default_month_keys, LoadParentFlow, WebToStoreFlow};
use bandcamp_etl::storage::CloudDestination;
use bandcamp_etl::types::WarehouseEngine;
use bandcamp_etl::warehouse::{
    file_keys, DuckDbWarehouse, PartitionKey, TableRef, TargetTemplate, Warehouse,
};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

const ITEMS_1: &str = r#"[
  {
    "_id": "a1",
    "@type": "MusicAlbum",
    "name": "First Light",
    "datePublished": "07 Jun 2019 00:00:00 GMT",
    "byArtist": {"@type": "MusicGroup", "name": "The Band", "@id": "https://band.bandcamp.com"},
    "offers": {"price": 7.0, "priceCurrency": "USD", "priceSpecification": {"minPrice": 7.0}},
    "numTracks": 9
  },
  {
    "_id": "a1",
    "@type": "MusicAlbum",
    "name": "First Light",
    "datePublished": "07 Jun 2019 00:00:00 GMT",
    "byArtist": {"@type": "MusicGroup", "name": "The Band", "@id": "https://band.bandcamp.com"},
    "offers": {"price": 7.0, "priceCurrency": "USD", "priceSpecification": {"minPrice": 7.0}},
    "numTracks": 9
  }
]"#;

const ITEMS_2: &str = r#"{"_id": "b1", "name": "Second", "datePublished": "not a date", "keywords": ["rock", "indie"]}"#;

fn archive() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
        for (name, content) in [
            ("bandcamp-items-1.json", ITEMS_1),
            ("bandcamp-items-2.json", ITEMS_2),
        ] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buf
}

async fn serve_archive() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bandcamp-items-json.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive()))
        .mount(&server)
        .await;
    server
}

fn pipeline_config(workdir: &Path, server: &MockServer) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.source.url = format!("{}/bandcamp-items-json.zip?dl=1", server.uri());
    config.source.download_dir = workdir.join("downloads");
    config.source.max_retries = 0;
    config.local.dir = workdir.join("bandcamp");
    config.store.url = workdir.join("bucket").display().to_string();
    config.store.max_retries = 0;
    config.warehouse.engine = WarehouseEngine::Duckdb;
    config.warehouse.object_root = Some(workdir.join("bucket"));
    config.warehouse.poll_interval_ms = 1;
    config.albums.uri = "gs://{{ bucket }}/bandcamp/bandcamp-items-{{ num }}.parquet".to_string();
    config
}

// ============================================================================
// Web To Store Integration Tests
// ============================================================================

#[tokio::test]
async fn test_archive_to_memory_bucket() {
    let server = serve_archive().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = pipeline_config(dir.path(), &server);
    config.store.url = "memory://prefect-gcs-bucket-bandcamp".to_string();

    let flow = WebToStoreFlow::from_config(&config).unwrap();
    let report = flow.run(&config.source.url).await.unwrap();

    assert!(report.is_complete());
    assert!(report.fetch.archive);
    assert!(report.fetch.progress.is_complete());
    let uris: Vec<_> = report.succeeded.iter().map(|f| f.remote.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec![
            "memory://prefect-gcs-bucket-bandcamp/bandcamp/bandcamp-items-1.parquet",
            "memory://prefect-gcs-bucket-bandcamp/bandcamp/bandcamp-items-2.parquet",
        ]
    );
    assert_eq!(report.succeeded[0].rows, 2);
    assert_eq!(report.succeeded[1].rows, 1);

    let destination = flow.publisher().destination();
    let meta = destination.head("bandcamp/bandcamp-items-2.parquet").await.unwrap();
    assert!(meta.size > 0);
    assert!(!dir.path().join("bandcamp").exists());
}

#[tokio::test]
async fn test_archive_to_local_bucket_then_warehouse() {
    let server = serve_archive().await;
    let dir = tempfile::tempdir().unwrap();
    let config = pipeline_config(dir.path(), &server);

    let report = WebToStoreFlow::from_config(&config)
        .unwrap()
        .run(&config.source.url)
        .await
        .unwrap();
    assert_eq!(report.succeeded.len(), 2);
    assert!(dir
        .path()
        .join("bucket/bandcamp/bandcamp-items-1.parquet")
        .is_file());

    // Load both files, then load file 1 again and deduplicate it
    let warehouse = Arc::new(DuckDbWarehouse::from_config(&config.warehouse).unwrap());
    let template = TargetTemplate::albums(&config.warehouse.project, &config.albums);
    let loads = LoadParentFlow::from_config(warehouse.clone(), template.clone(), &config, false)
        .run(&file_keys(&[1, 2]))
        .await
        .unwrap();
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0].load.rows, 2);
    assert_eq!(loads[1].load.rows, 1);

    let with_dedup = LoadParentFlow::from_config(warehouse.clone(), template, &config, true)
        .run(&[PartitionKey::File(1)])
        .await
        .unwrap();
    assert_eq!(with_dedup[0].load.rows, 4);
    assert_eq!(with_dedup[0].dedup.as_ref().unwrap().rows, 1);

    let table = TableRef::new(&config.warehouse.project, "bandcamp", "albums-full-info-1");
    assert_eq!(warehouse.row_count(&table).await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_archive_fails_before_any_upload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = pipeline_config(dir.path(), &server);

    let result = WebToStoreFlow::from_config(&config)
        .unwrap()
        .run(&config.source.url)
        .await;
    assert!(result.is_err());

    let bucket = CloudDestination::parse(&config.store.url).unwrap();
    assert!(bucket.head("bandcamp/bandcamp-items-1.parquet").await.is_err());
}

// ============================================================================
// Load Parent Integration Tests
// ============================================================================

#[tokio::test]
async fn test_trip_load_stops_at_missing_month() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::default();
    config.warehouse.engine = WarehouseEngine::Duckdb;
    config.warehouse.object_root = Some(dir.path().to_path_buf());
    config.warehouse.poll_interval_ms = 1;

    let warehouse = Arc::new(DuckDbWarehouse::from_config(&config.warehouse).unwrap());
    let keys = default_month_keys(&[2019], &[4, 5]).unwrap();
    let template = TargetTemplate::trips(&config.warehouse.project, &config.trips);

    let err = LoadParentFlow::from_config(warehouse.clone(), template, &config, false)
        .run(&keys)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("fhv_tripdata_2019-04"));

    let may = TableRef::new(&config.warehouse.project, "trips_data_all", "fhv_tripdata_2019_05");
    assert!(warehouse.row_count(&may).await.is_err());
}
