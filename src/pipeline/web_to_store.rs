//! Fetch-and-publish flow
//!
//! Fetches the source once, then for each JSON file runs
//! normalize → write → publish → cleanup. One file failing does not stop
//! the others; failures are collected in the report.

use crate::config::{LocalConfig, PipelineConfig};
use crate::error::Result;
use crate::fetch::{list_json_files, ArchiveFetcher, DownloadProgress, FetchOutcome};
use crate::http::{HttpClient, HttpClientConfig};
use crate::normalize::{NormalizeProfile, RecordNormalizer};
use crate::output::write_local;
use crate::storage::{remove_local, ObjectStorePublisher, RemoteObject};
use crate::warehouse::{album_schema, TableSchema};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// A file that made it to the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFile {
    /// Source JSON file
    pub source: PathBuf,
    /// Local Parquet file (removed after upload)
    pub local_path: PathBuf,
    pub remote: RemoteObject,
    pub rows: usize,
}

/// A file whose sub-pipeline failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of one fetch-and-publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebToStoreReport {
    pub fetch: FetchOutcome,
    pub succeeded: Vec<PublishedFile>,
    pub failed: Vec<FailedFile>,
}

impl WebToStoreReport {
    /// Whether every file was published
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch → normalize → write → publish → cleanup
pub struct WebToStoreFlow {
    fetcher: ArchiveFetcher,
    normalizer: RecordNormalizer,
    local: LocalConfig,
    schema: Option<TableSchema>,
    publisher: ObjectStorePublisher,
}

impl WebToStoreFlow {
    /// Assemble a flow from its parts
    pub fn new(
        fetcher: ArchiveFetcher,
        normalizer: RecordNormalizer,
        local: LocalConfig,
        publisher: ObjectStorePublisher,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            local,
            schema: Some(album_schema()),
            publisher,
        }
    }

    /// Build the flow from configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let http = HttpClient::with_config(
            HttpClientConfig::builder()
                .timeout(Duration::from_secs(config.source.timeout_secs))
                .build(),
        )?;
        let fetcher = ArchiveFetcher::new(http, &config.source.download_dir)
            .with_retry_policy(config.source.retry_policy());

        let root = config
            .local
            .dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let publisher = ObjectStorePublisher::from_config(&config.store)?.with_root(root);

        Ok(Self::new(
            fetcher,
            RecordNormalizer::new(NormalizeProfile::from(&config.normalize)),
            config.local.clone(),
            publisher,
        ))
    }

    /// Schema datasets are conformed to before writing
    #[must_use]
    pub fn with_schema(mut self, schema: Option<TableSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn publisher(&self) -> &ObjectStorePublisher {
        &self.publisher
    }

    /// Run the whole flow for one source URL
    ///
    /// A fetch failure is fatal. Per-file failures are logged and reported.
    pub async fn run(&self, url: &str) -> Result<WebToStoreReport> {
        let fetch = self.fetcher.fetch(url, DownloadProgress::new()).await?;
        let files = list_json_files(&fetch.path)?;
        info!(path = %fetch.path.display(), files = files.len(), "Fetched source");

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for file in files {
            match self.process_file(&file).await {
                Ok(published) => succeeded.push(published),
                Err(e) => {
                    error!(file = %file.display(), error = %e, "File failed");
                    failed.push(FailedFile {
                        source: file,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Web to store finished"
        );
        Ok(WebToStoreReport {
            fetch,
            succeeded,
            failed,
        })
    }

    /// Normalize, write, publish and clean up one source file
    ///
    /// A cleanup failure is logged, not returned.
    pub async fn process_file(&self, source: &Path) -> Result<PublishedFile> {
        let dataset = self.normalizer.normalize_file(source)?;
        let local_path = write_local(&dataset, source, &self.local, self.schema.as_ref())?;
        let remote = self.publisher.publish(&local_path).await?;

        if let Err(e) = remove_local(&local_path) {
            warn!(path = %local_path.display(), error = %e, "Cleanup failed");
        }

        Ok(PublishedFile {
            source: source.to_path_buf(),
            local_path,
            remote,
            rows: dataset.num_rows(),
        })
    }
}
