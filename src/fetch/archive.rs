//! Zip archive extraction

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// True when the file name carries an archive suffix we know how to extract
pub fn is_archive(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".zip")
}

/// Directory an archive is extracted into: the archive name without `.zip`
pub fn extraction_dir(download_dir: &Path, file_name: &str) -> PathBuf {
    let stem = if is_archive(file_name) {
        &file_name[..file_name.len() - ".zip".len()]
    } else {
        file_name
    };
    download_dir.join(stem)
}

/// Extract every file in `archive_path` under `target_dir`
///
/// Entries whose names would land outside `target_dir` are rejected.
/// Returns the extracted file paths in archive order.
pub fn extract_zip(archive_path: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path).map_err(|e| Error::filesystem(archive_path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::archive(format!("{}: {e}", archive_path.display())))?;

    fs::create_dir_all(target_dir).map_err(|e| Error::filesystem(target_dir, e))?;

    let mut extracted = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::archive(format!("{}: entry {i}: {e}", archive_path.display())))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::archive(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| Error::filesystem(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| Error::filesystem(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| Error::filesystem(&out_path, e))?;

        debug!("Extracted {}", out_path.display());
        extracted.push(out_path);
    }

    Ok(extracted)
}
