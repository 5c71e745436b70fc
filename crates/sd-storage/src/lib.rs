//! sd-storage: image blob storage.
//!
//! A [`BlobStore`] saves validated image uploads and deletes them again by
//! key. Two backends exist: [`LocalBlobStore`] writes into a directory that
//! the server exposes as static files, and [`RemoteBlobStore`] pushes objects
//! to an S3-style HTTP store.

pub mod local;
pub mod naming;
pub mod remote;
pub mod upload;

use std::sync::Arc;

use async_trait::async_trait;
use sd_core::config::StorageConfig;
use sd_core::{ImageRef, Result};

pub use local::LocalBlobStore;
pub use remote::RemoteBlobStore;
pub use upload::{ImageUpload, UploadPolicy};

/// Storage for uploaded images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend name used in logs and error details.
    fn backend(&self) -> &'static str;

    /// Store an image and return where it can be found.
    async fn put(&self, upload: &ImageUpload) -> Result<ImageRef>;

    /// Delete an image by key. Deleting a missing image succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Build the blob store selected by `config`.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config {
        StorageConfig::Local(local) => {
            tracing::info!(dir = %local.dir.display(), prefix = %local.url_prefix, "Using local image storage");
            Ok(Arc::new(LocalBlobStore::from_config(local)))
        }
        StorageConfig::Remote(remote) => {
            if remote.endpoint.is_empty() || remote.bucket.is_empty() {
                return Err(sd_core::Error::storage(
                    "remote",
                    "remote storage needs both endpoint and bucket",
                ));
            }
            let token = std::env::var(&remote.token_env).ok();
            if token.is_none() {
                tracing::warn!(
                    "{} is not set; remote storage requests will be unauthenticated",
                    remote.token_env
                );
            }
            tracing::info!(endpoint = %remote.endpoint, bucket = %remote.bucket, "Using remote image storage");
            Ok(Arc::new(RemoteBlobStore::from_config(remote, token)))
        }
    }
}
