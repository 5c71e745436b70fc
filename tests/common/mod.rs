//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a local image
//! store inside a temp directory, and the full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use sd_core::config::{Config, LocalStorageConfig, StorageConfig};
use sd_db::pool::{init_memory_pool, DbPool};
use sd_server::context::AppContext;
use sd_server::router::build_router;
use sd_storage::{BlobStore, LocalBlobStore};
use tempfile::TempDir;

/// Smallest payloads the magic-byte sniffing recognises.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub image_dir: PathBuf,
    _tmp: TempDir,
}

impl TestHarness {
    /// Create a new harness with the local image store in a temp directory.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let local = LocalStorageConfig {
            dir: tmp.path().join("schoolImages"),
            url_prefix: "/schoolImages".into(),
        };
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::from_config(&local));
        Self::build(tmp, local, blobs)
    }

    /// Create a harness whose blob store is `blobs` instead of the local one.
    pub fn with_blobs(blobs: Arc<dyn BlobStore>) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let local = LocalStorageConfig {
            dir: tmp.path().join("schoolImages"),
            url_prefix: "/schoolImages".into(),
        };
        Self::build(tmp, local, blobs)
    }

    fn build(tmp: TempDir, local: LocalStorageConfig, blobs: Arc<dyn BlobStore>) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let mut config = Config::default();
        config.storage = StorageConfig::Local(local.clone());

        let ctx = AppContext::new(db.clone(), config, blobs);
        Self {
            ctx,
            db,
            image_dir: local.dir,
            _tmp: tmp,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Serve this harness on a random port.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Names of the files currently in the image directory.
    pub fn stored_images(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.image_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> sd_db::pool::PooledConnection {
        sd_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }
}

/// Text fields of a valid school form.
pub fn school_form(name: &str, contact: &str) -> Form {
    Form::new()
        .text("name", name.to_string())
        .text("address", "1 Elm St")
        .text("city", "Springfield")
        .text("state", "IL")
        .text("contact", contact.to_string())
        .text("email_id", "x@y.com")
}

/// A file part for the `image` field.
pub fn image_part(file_name: &str, mime: &str, bytes: &[u8]) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("valid mime")
}

/// POST a form and return the created id.
pub async fn create_school(addr: SocketAddr, form: Form) -> i64 {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/schools"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_i64().expect("id in create response")
}

/// Fetch one school through `GET /api/schools?id=`.
pub async fn fetch_school(addr: SocketAddr, id: i64) -> serde_json::Value {
    let resp = reqwest::get(format!("http://{addr}/api/schools?id={id}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let mut list: Vec<serde_json::Value> = resp.json().await.unwrap();
    assert_eq!(list.len(), 1);
    list.remove(0)
}
