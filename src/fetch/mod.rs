//! Archive fetcher module
//!
//! Downloads the source dataset and yields a local directory of files.
//!
//! # Overview
//!
//! - [`file_name_from_url`] derives the local name from the URL path
//! - [`ArchiveFetcher::fetch`] downloads (with retries) and extracts zips
//! - [`DownloadProgress`] is threaded through each fetch by value
//! - [`list_json_files`] enumerates the files the normalizer will read

mod archive;
mod fetcher;
mod progress;

pub use archive::{extract_zip, extraction_dir, is_archive};
pub use fetcher::{file_name_from_url, list_json_files, ArchiveFetcher, FetchOutcome};
pub use progress::DownloadProgress;
