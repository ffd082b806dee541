//! Uploads local files to the object store

use super::destination::CloudDestination;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::retry::{retry_any, RetryPolicy};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// An uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Object key (relative local path with `/` separators)
    pub key: String,

    /// Full object URI
    pub uri: String,
}

/// Object key for a local file
///
/// The path is taken relative to `root` when it lies below it; `.` and
/// root components are dropped and the rest joined with `/`.
pub fn object_key_for(local_path: &Path, root: &Path) -> String {
    let relative = local_path.strip_prefix(root).unwrap_or(local_path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Publishes local files to a destination, retrying failed uploads
#[derive(Debug, Clone)]
pub struct ObjectStorePublisher {
    destination: CloudDestination,
    root: PathBuf,
    retry: RetryPolicy,
}

impl ObjectStorePublisher {
    /// Create a publisher with keys relative to the working directory
    pub fn new(destination: CloudDestination) -> Self {
        Self {
            destination,
            root: PathBuf::new(),
            retry: RetryPolicy::fixed(3, std::time::Duration::from_secs(10)),
        }
    }

    /// Create a publisher from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let destination = CloudDestination::parse(&config.url)?;
        Ok(Self::new(destination).with_retry_policy(config.retry_policy()))
    }

    /// Compute keys relative to `root`
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the upload retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn destination(&self) -> &CloudDestination {
        &self.destination
    }

    /// Upload one local file under its relative path
    pub async fn publish(&self, local_path: &Path) -> Result<RemoteObject> {
        let key = object_key_for(local_path, &self.root);
        if key.is_empty() {
            return Err(Error::config(format!(
                "Cannot derive an object key from {}",
                local_path.display()
            )));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| Error::filesystem(local_path, e))?;
        let data = Bytes::from(data);
        let size = data.len();

        let uri = retry_any(&self.retry, "upload", |_| {
            let data = data.clone();
            let key = key.as_str();
            async move { self.destination.put(key, data).await }
        })
        .await?;

        info!(key = %key, uri = %uri, bytes = size, "Uploaded object");
        Ok(RemoteObject { key, uri })
    }
}
