//! Parquet file writer
//!
//! Writes datasets to local Parquet files and reads them back.

use super::schema::dataset_to_batch;
use crate::config::LocalConfig;
use crate::error::{Error, Result};
use crate::normalize::{dataset_stem, TabularDataset};
use crate::types::OutputCompression;
use crate::warehouse::TableSchema;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
    dictionary_enabled: bool,
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression codec
    #[must_use]
    pub fn with_compression(mut self, compression: impl Into<Compression>) -> Self {
        self.compression = compression.into();
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Compression codec in use
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_dictionary_enabled(self.dictionary_enabled)
            .build()
    }
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: OutputCompression::default().into(),
            row_group_size: 1024 * 1024,
            dictionary_enabled: true,
        }
    }
}

/// Parquet file writer
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(
        path: impl AsRef<Path>,
        schema: &Schema,
        config: &ParquetWriterConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::filesystem(path, e))?;

        let props = config.build_properties();
        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch to the file
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch)?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Get the number of rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Close the writer and finalize the file
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close()?;
        Ok(rows)
    }
}

/// Write a single RecordBatch to a Parquet file
pub fn write_batch_to_parquet(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let mut writer = ParquetWriter::new(path, batch.schema().as_ref(), config)?;
    writer.write(batch)?;
    writer.close()
}

/// Local path of the Parquet file for a source file
///
/// `<dir>/<stem>.parquet`, where stem is the source base name up to its first `.`
pub fn local_parquet_path(dir: &Path, source_file: &Path) -> PathBuf {
    dir.join(format!("{}.parquet", dataset_stem(source_file)))
}

/// Write a dataset next to its siblings in the local output directory
///
/// Creates the directory when needed. With `conform_to_schema` set and a
/// schema given, the file follows the declared schema.
pub fn write_local(
    dataset: &TabularDataset,
    source_file: &Path,
    config: &LocalConfig,
    schema: Option<&TableSchema>,
) -> Result<PathBuf> {
    let dir = config.dir.as_path();
    std::fs::create_dir_all(dir).map_err(|e| Error::filesystem(dir, e))?;

    let path = local_parquet_path(dir, source_file);
    let schema = schema.filter(|_| config.conform_to_schema);
    let batch = dataset_to_batch(dataset, schema)?;
    let writer_config = ParquetWriterConfig::new().with_compression(config.compression);
    let rows = write_batch_to_parquet(&path, &batch, &writer_config)?;

    info!(
        path = %path.display(),
        rows,
        columns = batch.num_columns(),
        "Wrote Parquet file"
    );
    Ok(path)
}

/// Read every batch of a Parquet file
pub fn read_parquet(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::filesystem(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batches)
}
