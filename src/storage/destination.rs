//! Object store destinations (GCS, S3, R2, Azure, memory, local)

use crate::error::{Error, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::sync::Arc;

/// Object store destination parsed from URL
#[derive(Debug, Clone)]
pub struct CloudDestination {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Bucket, container, or local root
    bucket: String,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL scheme (gs, s3, r2, az, memory, file)
    scheme: String,
}

impl CloudDestination {
    /// Parse a destination URL and create the matching object store
    ///
    /// Supported formats:
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://bucket/path/` - in-process store
    /// - `/local/path/`, `./path/` or `file:///path` - local filesystem
    ///
    /// Credentials come from the environment, as each SDK builder reads them.
    pub fn parse(url: &str) -> Result<Self> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Self::parse_local(url);
        };

        if scheme == "file" {
            return Self::parse_local(rest);
        }

        let (bucket, prefix) = split_bucket(rest);
        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in destination URL: {url}")));
        }

        let store: Arc<dyn ObjectStore> = match scheme {
            "gs" => Arc::new(
                GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?,
            ),
            "s3" | "r2" => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if scheme == "r2" {
                    if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                        builder = builder.with_endpoint(endpoint);
                    }
                }
                Arc::new(
                    builder
                        .build()
                        .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?,
                )
            }
            "az" => Arc::new(
                MicrosoftAzureBuilder::from_env()
                    .with_container_name(bucket)
                    .build()
                    .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?,
            ),
            "memory" => Arc::new(InMemory::new()),
            other => {
                return Err(Error::config(format!(
                    "Unsupported destination scheme '{other}' in {url}"
                )))
            }
        };

        Ok(Self {
            store,
            bucket: bucket.to_string(),
            prefix,
            scheme: scheme.to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::filesystem(path, e))?;

        let store = LocalFileSystem::new_with_prefix(path)?;
        let root = std::fs::canonicalize(path).map_err(|e| Error::filesystem(path, e))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: root.to_string_lossy().trim_end_matches('/').to_string(),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Wrap an existing store
    pub fn from_store(store: Arc<dyn ObjectStore>, scheme: &str, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            prefix: String::new(),
            scheme: scheme.to_string(),
        }
    }

    /// Check if this is a remote destination (not local or in-process)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Get the scheme (gs, s3, r2, az, memory, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Bucket or container name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Store path of an object key, below the destination prefix
    pub fn object_path(&self, key: &str) -> ObjectPath {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix))
        }
    }

    /// Full URI of an object key
    pub fn uri_for(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.object_path(key))
    }

    /// Upload bytes under a key, returning the object URI
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        let path = self.object_path(key);
        self.store.put(&path, data.into()).await?;
        Ok(self.uri_for(key))
    }

    /// Download an object
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let result = self.store.get(&self.object_path(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Metadata of an object
    pub async fn head(&self, key: &str) -> Result<ObjectMeta> {
        Ok(self.store.head(&self.object_path(key)).await?)
    }
}

/// Split `bucket/some/prefix/` into `("bucket", "some/prefix")`
fn split_bucket(rest: &str) -> (&str, String) {
    match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix.trim_matches('/').to_string()),
        None => (rest, String::new()),
    }
}
