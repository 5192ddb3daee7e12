//! Storage locations (local filesystem, S3, R2, GCS, Azure)

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::sync::Arc;

/// A root location inside an object store
#[derive(Clone)]
pub struct StoreLocation {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL scheme for logging
    scheme: String,
    /// Location as configured
    url: String,
}

impl fmt::Debug for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLocation")
            .field("url", &self.url)
            .field("scheme", &self.scheme)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl StoreLocation {
    /// Parse an output location, creating a local directory if needed
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        Self::parse_with(url, true)
    }

    /// Parse an input location; a local directory must already exist
    pub fn parse_existing(url: &str) -> Result<Self> {
        Self::parse_with(url, false)
    }

    /// In-memory store, mostly useful for tests
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: String::new(),
            scheme: "memory".to_string(),
            url: "memory://".to_string(),
        }
    }

    fn parse_with(url: &str, create_local: bool) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::config("Storage location cannot be empty"));
        }

        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else {
            Self::parse_local(url, create_local)
        }
    }

    /// Split `bucket/some/prefix` into its parts
    fn split_bucket<'a>(url: &'a str, scheme: &str) -> Result<(&'a str, String)> {
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_end_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };

        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in URL: {url}")));
        }
        Ok((bucket, prefix))
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let (bucket, prefix) = Self::split_bucket(url, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // AWS_ENDPOINT is read by from_env(); R2 may also set its own variable
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: scheme.to_string(),
            url: url.to_string(),
        })
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let (bucket, prefix) = Self::split_bucket(url, "gs")?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "gs".to_string(),
            url: url.to_string(),
        })
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let (container, prefix) = Self::split_bucket(url, "az")?;

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "az".to_string(),
            url: url.to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(url: &str, create: bool) -> Result<Self> {
        let path = url.strip_prefix("file://").unwrap_or(url);

        if create {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        } else if !std::path::Path::new(path).is_dir() {
            return Err(Error::FileNotFound {
                path: path.to_string(),
            });
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
            url: url.to_string(),
        })
    }

    /// Check if this is a cloud location (not local or in-memory)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Get the scheme (s3, r2, gs, az, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Location as configured
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolve a path relative to this location
    pub fn child(&self, relative: &str) -> ObjectPath {
        let relative = relative.trim_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(relative)
        } else if relative.is_empty() {
            ObjectPath::from(self.prefix.as_str())
        } else {
            ObjectPath::from(format!("{}/{relative}", self.prefix))
        }
    }

    /// Path of an object relative to this location
    pub fn relative<'a>(&self, path: &'a ObjectPath) -> &'a str {
        let raw = path.as_ref();
        if self.prefix.is_empty() {
            raw
        } else {
            raw.strip_prefix(self.prefix.as_str())
                .map_or(raw, |rest| rest.trim_start_matches('/'))
        }
    }

    /// List every object below `relative`, sorted by path
    pub async fn list(&self, relative: &str) -> Result<Vec<ObjectPath>> {
        let root = self.child(relative);
        let prefix = if root.as_ref().is_empty() {
            None
        } else {
            Some(&root)
        };

        let mut paths: Vec<ObjectPath> = self
            .store
            .list(prefix)
            .map_ok(|meta| meta.location)
            .try_collect()
            .await?;
        paths.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        Ok(paths)
    }

    /// Read a whole object
    pub async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        let result = self.store.get(path).await?;
        Ok(result.bytes().await?)
    }

    /// Write bytes below this location, returning the full path for logging
    pub async fn write(&self, relative: &str, data: Bytes) -> Result<String> {
        let path = self.child(relative);

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| Error::output(format!("Failed to write {path}: {e}")))?;

        Ok(format!("{}://{path}", self.scheme))
    }

    /// Delete every object below `relative`, returning how many were removed
    pub async fn delete_all(&self, relative: &str) -> Result<usize> {
        let paths = self.list(relative).await?;
        for path in &paths {
            self.store.delete(path).await?;
        }
        Ok(paths.len())
    }
}
