//! Blob store backed by a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sd_core::config::LocalStorageConfig;
use sd_core::{Error, ImageRef, Result};
use tokio::io::AsyncWriteExt;

use crate::naming::{local_name, UniqueStamp};
use crate::upload::ImageUpload;
use crate::BlobStore;

const BACKEND: &str = "local";

/// Writes images into a directory that is served under `url_prefix`.
#[derive(Debug)]
pub struct LocalBlobStore {
    dir: PathBuf,
    url_prefix: String,
    stamp: UniqueStamp,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into();
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            stamp: UniqueStamp::new(),
        }
    }

    pub fn from_config(config: &LocalStorageConfig) -> Self {
        Self::new(&config.dir, &config.url_prefix)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if matches!(key, "" | "." | "..") || key.contains('/') || key.contains('\\') {
            return Err(Error::storage(BACKEND, format!("invalid image key {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn put(&self, upload: &ImageUpload) -> Result<ImageRef> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::storage(
                BACKEND,
                format!("failed to create {}: {e}", self.dir.display()),
            )
        })?;

        let name = local_name(self.stamp.next(), &upload.file_name);
        let path = self.path_for(&name)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Error::storage(BACKEND, format!("failed to create {}: {e}", path.display())))?;

        let written = async {
            file.write_all(&upload.bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            remove_partial(&path).await;
            return Err(Error::storage(
                BACKEND,
                format!("failed to write {}: {e}", path.display()),
            ));
        }

        tracing::debug!(path = %path.display(), bytes = upload.len(), "Stored image");

        Ok(ImageRef {
            url: format!("{}/{name}", self.url_prefix),
            key: name,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(
                BACKEND,
                format!("failed to delete {}: {e}", path.display()),
            )),
        }
    }
}

/// Best-effort cleanup of a file whose write failed. Returns whether the path is gone.
async fn remove_partial(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written image"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::tests::PNG_MAGIC;

    fn store(dir: &Path) -> LocalBlobStore {
        LocalBlobStore::new(dir.join("schoolImages"), "/schoolImages/")
    }

    #[tokio::test]
    async fn put_writes_file_and_returns_url() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let stored = store
            .put(&ImageUpload::new("logo.png", "image/png", PNG_MAGIC))
            .await
            .unwrap();

        assert!(stored.key.ends_with("-logo.png"));
        assert_eq!(stored.url, format!("/schoolImages/{}", stored.key));
        let on_disk = std::fs::read(store.dir().join(&stored.key)).unwrap();
        assert_eq!(on_disk, PNG_MAGIC);
    }

    #[tokio::test]
    async fn partial_write_cleanup_reports_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let partial = tmp.path().join("half.png");
        std::fs::write(&partial, &PNG_MAGIC[..4]).unwrap();

        assert!(remove_partial(&partial).await);
        assert!(!partial.exists());
        // Already gone counts as cleaned up.
        assert!(remove_partial(&partial).await);

        // A directory can't be removed as a file; the failure is logged, not swallowed.
        let stuck = tmp.path().join("stuck");
        std::fs::create_dir(&stuck).unwrap();
        assert!(!remove_partial(&stuck).await);
        assert!(stuck.exists());
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let upload = ImageUpload::new("logo.png", "image/png", PNG_MAGIC);

        let a = store.put(&upload).await.unwrap();
        let b = store.put(&upload).await.unwrap();
        assert_ne!(a.key, b.key);
        assert!(store.dir().join(&a.key).exists());
        assert!(store.dir().join(&b.key).exists());
    }

    #[tokio::test]
    async fn hostile_file_name_stays_inside_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());

        let stored = store
            .put(&ImageUpload::new("../../evil.png", "image/png", PNG_MAGIC))
            .await
            .unwrap();
        assert!(stored.key.ends_with("-evil.png"));
        assert!(store.dir().join(&stored.key).exists());
    }

    #[tokio::test]
    async fn delete_removes_file_and_tolerates_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let stored = store
            .put(&ImageUpload::new("logo.png", "image/png", PNG_MAGIC))
            .await
            .unwrap();

        store.delete(&stored.key).await.unwrap();
        assert!(!store.dir().join(&stored.key).exists());
        store.delete(&stored.key).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        std::fs::write(tmp.path().join("keep.txt"), b"x").unwrap();

        assert!(store.delete("../keep.txt").await.is_err());
        assert!(store.delete("..").await.is_err());
        assert!(tmp.path().join("keep.txt").exists());
    }
}
