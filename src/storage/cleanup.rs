//! Local cleanup after publishing

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Delete a local file, then its parent directory if that is now empty
///
/// A non-empty parent is left in place.
pub fn remove_local(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| Error::filesystem(path, e))?;
    debug!(path = %path.display(), "Removed local file");

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    let is_empty = std::fs::read_dir(parent)
        .map_err(|e| Error::filesystem(parent, e))?
        .next()
        .is_none();
    if !is_empty {
        return Ok(());
    }

    match std::fs::remove_dir(parent) {
        Ok(()) => {
            debug!(path = %parent.display(), "Removed empty directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::filesystem(parent, e)),
    }
}
