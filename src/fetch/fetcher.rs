//! Archive fetcher
//!
//! Downloads a dataset from a URL into a local directory and, for zip
//! archives, extracts it.

use super::archive::{extract_zip, extraction_dir, is_archive};
use super::progress::DownloadProgress;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::retry::{retry_async, RetryPolicy};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Extracted directory for archives, otherwise the downloaded file
    pub path: PathBuf,
    /// Whether the download was an archive that got extracted
    pub archive: bool,
    /// Progress after the download finished
    pub progress: DownloadProgress,
}

/// Derive the local file name from a URL: its last path segment, without
/// the query string
///
/// `https://host/s/abc/items.zip?dl=1` becomes `items.zip`.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let name = parsed
        .path_segments()
        .and_then(Iterator::last)
        .unwrap_or_default();

    if name.is_empty() {
        return Err(Error::config(format!(
            "Cannot derive a file name from URL '{url}'"
        )));
    }
    Ok(name.to_string())
}

/// Downloads source data to local disk
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    http: HttpClient,
    download_dir: PathBuf,
    retry: RetryPolicy,
}

impl ArchiveFetcher {
    /// Create a fetcher writing into `download_dir`
    pub fn new(http: HttpClient, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            download_dir: download_dir.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set how often a failed download is restarted
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Directory downloads land in
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download `url`; extract it if it is a zip archive
    ///
    /// `progress` is the starting point for byte counting and is returned,
    /// advanced, in the outcome. A download that fails part way is restarted
    /// from scratch according to the retry policy.
    pub async fn fetch(&self, url: &str, progress: DownloadProgress) -> Result<FetchOutcome> {
        let file_name = file_name_from_url(url)?;
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| Error::filesystem(&self.download_dir, e))?;

        let target = self.download_dir.join(&file_name);
        info!("Downloading {url} to {}", target.display());

        let progress = retry_async(&self.retry, "download", |_| {
            self.download(url, &target, progress)
        })
        .await?;

        if !is_archive(&file_name) {
            info!(
                "Download complete: {} ({} bytes)",
                target.display(),
                progress.downloaded()
            );
            return Ok(FetchOutcome {
                path: target,
                archive: false,
                progress,
            });
        }

        let dir = extraction_dir(&self.download_dir, &file_name);
        let archive_path = target.clone();
        let extract_dir = dir.clone();
        let files = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &extract_dir))
            .await
            .map_err(|e| Error::archive(format!("extraction task failed: {e}")))??;

        info!(
            "Download complete, extracted {} files to {}",
            files.len(),
            dir.display()
        );
        Ok(FetchOutcome {
            path: dir,
            archive: true,
            progress,
        })
    }

    /// One download attempt, streamed to disk chunk by chunk
    async fn download(
        &self,
        url: &str,
        target: &Path,
        progress: DownloadProgress,
    ) -> Result<DownloadProgress> {
        let mut response = self.http.get(url).await?;
        let mut progress = progress.begin(response.content_length());

        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|e| Error::filesystem(target, e))?;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::filesystem(target, e))?;
            if let Some(percent) = progress.advance(chunk.len() as u64) {
                debug!(
                    "Downloaded {percent}% ({} of {} bytes)",
                    progress.downloaded(),
                    progress.total().unwrap_or_default()
                );
            }
        }

        file.flush().await.map_err(|e| Error::filesystem(target, e))?;
        Ok(progress)
    }
}

/// List the JSON files a fetch produced
///
/// A single `.json` file is returned as-is; a directory is walked
/// recursively. Results are sorted for a stable processing order.
pub fn list_json_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(if has_json_extension(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    collect_json_files(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_json_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::filesystem(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| Error::filesystem(dir, e))?.path();
        if path.is_dir() {
            collect_json_files(&path, files)?;
        } else if has_json_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
