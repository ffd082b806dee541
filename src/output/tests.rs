//! Tests for output module

use super::*;
use crate::config::LocalConfig;
use crate::normalize::TabularDataset;
use crate::types::{JsonObject, JsonValue, OutputCompression};
use crate::warehouse::{album_schema, trip_schema, FieldType, TableSchema};
use arrow::datatypes::{DataType, TimeUnit};
use parquet::basic::Compression;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

fn dataset(records: &[JsonValue]) -> TabularDataset {
    TabularDataset::from_records("items", records, "_")
}

fn local_config(dir: &Path) -> LocalConfig {
    LocalConfig {
        dir: dir.to_path_buf(),
        ..Default::default()
    }
}

fn padded(ds: &TabularDataset) -> Vec<JsonObject> {
    ds.rows
        .iter()
        .map(|row| {
            ds.columns
                .iter()
                .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(JsonValue::Null)))
                .collect()
        })
        .collect()
}

// ============================================================================
// Inferred Conversion Tests
// ============================================================================

#[test]
fn test_inferred_types_follow_column_order() {
    let ds = dataset(&[
        json!({"name": "Alice", "age": 30, "score": 1.5, "active": true}),
        json!({"name": "Bob", "age": 25, "score": 2, "active": false}),
    ]);

    let batch = dataset_to_batch(&ds, None).unwrap();
    let schema = batch.schema();
    let types: Vec<_> = schema
        .fields()
        .iter()
        .map(|f| (f.name().as_str(), f.data_type().clone()))
        .collect();

    assert_eq!(
        types,
        vec![
            ("name", DataType::Utf8),
            ("age", DataType::Int64),
            ("score", DataType::Float64),
            ("active", DataType::Boolean),
        ]
    );
    assert_eq!(batch.num_rows(), 2);
}

#[test]
fn test_inferred_mixed_and_null_columns_become_text() {
    let ds = dataset(&[
        json!({"mixed": 1, "empty": null, "meta": {}}),
        json!({"mixed": "one", "empty": null}),
    ]);

    let batch = dataset_to_batch(&ds, None).unwrap();
    let schema = batch.schema();
    assert_eq!(schema.field_with_name("mixed").unwrap().data_type(), &DataType::Utf8);
    assert_eq!(schema.field_with_name("empty").unwrap().data_type(), &DataType::Utf8);
    assert_eq!(schema.field_with_name("meta").unwrap().data_type(), &DataType::Utf8);

    let rows = batches_to_rows(&[batch]).unwrap();
    assert_eq!(rows[0]["mixed"], json!("1"));
    assert_eq!(rows[0]["meta"], json!("{}"));
    assert_eq!(rows[1]["meta"], JsonValue::Null);
}

#[test]
fn test_inferred_lists() {
    let ds = dataset(&[
        json!({"tags": ["rock", "indie"], "tracks": [{"name": "a"}]}),
        json!({"tags": []}),
    ]);

    let batch = dataset_to_batch(&ds, None).unwrap();
    let schema = batch.schema();
    assert!(matches!(
        schema.field_with_name("tags").unwrap().data_type(),
        DataType::List(item) if item.data_type() == &DataType::Utf8
    ));
    assert_eq!(schema.field_with_name("tracks").unwrap().data_type(), &DataType::Utf8);

    let rows = batches_to_rows(&[batch]).unwrap();
    assert_eq!(rows[0]["tags"], json!(["rock", "indie"]));
    assert_eq!(rows[1]["tags"], json!([]));
    assert_eq!(rows[1]["tracks"], JsonValue::Null);
}

#[test]
fn test_inferred_timestamp_columns() {
    let mut ds = dataset(&[json!({"when": "2020-01-01T00:00:00"}), json!({"when": null})]);
    ds.timestamp_columns.insert("when".to_string());

    let batch = dataset_to_batch(&ds, None).unwrap();
    assert_eq!(
        batch.schema().field(0).data_type(),
        &DataType::Timestamp(TimeUnit::Microsecond, None)
    );

    let rows = batches_to_rows(&[batch]).unwrap();
    assert_eq!(rows[0]["when"], json!("2020-01-01T00:00:00"));
    assert_eq!(rows[1]["when"], JsonValue::Null);
}

#[test]
fn test_empty_dataset_converts() {
    let batch = dataset_to_batch(&TabularDataset::new("empty"), None).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 0);
}

// ============================================================================
// Conformed Conversion Tests
// ============================================================================

#[test]
fn test_conform_to_album_schema() {
    let ds = dataset(&[json!({
        "name": "Album",
        "numTracks": 9,
        "offers": {"price": "7.5", "priceCurrency": "USD"},
        "keywords": ["rock", "indie"],
        "unexpected": true
    })]);
    let schema = album_schema();

    let batch = dataset_to_batch(&ds, Some(&schema)).unwrap();

    assert_eq!(batch.num_columns(), 39);
    assert!(batch.schema().field_with_name("unexpected").is_err());

    let rows = batches_to_rows(&[batch]).unwrap();
    assert_eq!(rows[0]["name"], json!("Album"));
    assert_eq!(rows[0]["numTracks"], json!(9.0));
    assert_eq!(rows[0]["offers_price"], json!(7.5));
    assert_eq!(rows[0]["offers_priceCurrency"], json!("USD"));
    assert_eq!(rows[0]["keywords"], json!(r#"["rock","indie"]"#));
    assert_eq!(rows[0]["_id"], JsonValue::Null);
}

#[test]
fn test_conform_to_trip_schema_parses_timestamps() {
    let ds = dataset(&[json!({
        "dispatching_base_num": "B00001",
        "pickup_datetime": "2019-04-01 00:15:00",
        "dropOff_datetime": "garbage",
        "PUlocationID": "264",
        "SR_Flag": null
    })]);

    let batch = dataset_to_batch(&ds, Some(&trip_schema())).unwrap();
    let rows = batches_to_rows(&[batch]).unwrap();

    assert_eq!(rows[0]["pickup_datetime"], json!("2019-04-01T00:15:00"));
    assert_eq!(rows[0]["dropOff_datetime"], JsonValue::Null);
    assert_eq!(rows[0]["PUlocationID"], json!(264.0));
    assert_eq!(rows[0]["SR_Flag"], JsonValue::Null);
}

#[test]
fn test_conform_integer_and_boolean() {
    let schema = TableSchema::nullable(&[("n", FieldType::Integer), ("b", FieldType::Boolean)]);
    let ds = dataset(&[
        json!({"n": 3.0, "b": "TRUE"}),
        json!({"n": 3.5, "b": 1}),
        json!({"n": "42", "b": false}),
    ]);

    let rows = batches_to_rows(&[dataset_to_batch(&ds, Some(&schema)).unwrap()]).unwrap();

    assert_eq!(rows[0], json!({"n": 3, "b": true}).as_object().unwrap().clone());
    assert_eq!(rows[1], json!({"n": null, "b": null}).as_object().unwrap().clone());
    assert_eq!(rows[2], json!({"n": 42, "b": false}).as_object().unwrap().clone());
}

// ============================================================================
// Parquet Writer Tests
// ============================================================================

#[test]
fn test_parquet_writer_config_default_is_gzip() {
    let config = ParquetWriterConfig::default();
    assert!(matches!(config.compression(), Compression::GZIP(_)));
    assert_eq!(config.row_group_size(), 1024 * 1024);
}

#[test]
fn test_parquet_writer_config_builder() {
    let config = ParquetWriterConfig::new()
        .with_compression(OutputCompression::Zstd)
        .with_row_group_size(500)
        .with_dictionary(false);
    assert!(matches!(config.compression(), Compression::ZSTD(_)));
    assert_eq!(config.row_group_size(), 500);
}

#[test]
fn test_parquet_writer_rows_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.parquet");
    let ds = dataset(&[json!({"a": 1}), json!({"a": 2})]);
    let batch = dataset_to_batch(&ds, None).unwrap();

    let mut writer =
        ParquetWriter::new(&path, batch.schema().as_ref(), &ParquetWriterConfig::new()).unwrap();
    writer.write(&batch).unwrap();
    writer.write(&batch).unwrap();
    assert_eq!(writer.rows_written(), 4);
    assert_eq!(writer.close().unwrap(), 4);

    let total: usize = read_parquet(&path).unwrap().iter().map(|b| b.num_rows()).sum();
    assert_eq!(total, 4);
}

#[test]
fn test_local_parquet_path_uses_stem() {
    assert_eq!(
        local_parquet_path(Path::new("bandcamp"), Path::new("data/bandcamp-items-3.json")),
        Path::new("bandcamp").join("bandcamp-items-3.parquet")
    );
}

#[test]
fn test_write_local_roundtrip() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("bandcamp");
    let mut ds = dataset(&[
        json!({"name": "One", "tracks": 3, "price": 1.5, "tags": ["a"], "datePublished": "2020-01-01T00:00:00"}),
        json!({"name": "Two", "extra": false, "datePublished": null}),
    ]);
    ds.timestamp_columns.insert("datePublished".to_string());

    let path = write_local(&ds, Path::new("src/items-1.json"), &local_config(&out), None).unwrap();
    assert_eq!(path, out.join("items-1.parquet"));

    let rows = batches_to_rows(&read_parquet(&path).unwrap()).unwrap();
    assert_eq!(rows, padded(&ds));
}

#[test]
fn test_write_local_existing_directory_is_fine() {
    let dir = tempdir().unwrap();
    let ds = dataset(&[json!({"a": 1})]);
    let config = local_config(dir.path());

    write_local(&ds, Path::new("x.json"), &config, None).unwrap();
    let path = write_local(&ds, Path::new("x.json"), &config, None).unwrap();
    assert!(path.exists());
}

#[test]
fn test_write_local_conforms_when_configured() {
    let dir = tempdir().unwrap();
    let ds = dataset(&[json!({"name": "Album", "other": 1})]);
    let schema = album_schema();

    let conformed =
        write_local(&ds, Path::new("a.json"), &local_config(dir.path()), Some(&schema)).unwrap();
    let batches = read_parquet(&conformed).unwrap();
    assert_eq!(batches[0].num_columns(), 39);

    let config = LocalConfig {
        conform_to_schema: false,
        ..local_config(dir.path())
    };
    let inferred = write_local(&ds, Path::new("b.json"), &config, Some(&schema)).unwrap();
    assert_eq!(read_parquet(&inferred).unwrap()[0].num_columns(), 2);
}

#[test]
fn test_write_local_unwritable_directory_is_filesystem_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "").unwrap();

    let err = write_local(
        &dataset(&[json!({"a": 1})]),
        Path::new("a.json"),
        &local_config(&blocker.join("sub")),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, crate::error::Error::Filesystem { .. }));
}

#[test]
fn test_read_parquet_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        read_parquet(dir.path().join("missing.parquet")),
        Err(crate::error::Error::Filesystem { .. })
    ));
}
