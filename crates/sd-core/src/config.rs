//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, upload and blob storage sections. Every section defaults sensibly
//! so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Environment variable overriding `server.db_path`.
pub const ENV_DB_PATH: &str = "SCHOOLDIR_DB_PATH";
/// Environment variable overriding `server.host`.
pub const ENV_HOST: &str = "SCHOOLDIR_HOST";
/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "SCHOOLDIR_PORT";
/// Environment variable selecting the storage backend (`local` or `remote`).
pub const ENV_STORAGE_BACKEND: &str = "SCHOOLDIR_STORAGE_BACKEND";
/// Environment variable overriding the remote store endpoint.
pub const ENV_STORAGE_ENDPOINT: &str = "SCHOOLDIR_STORAGE_ENDPOINT";
/// Environment variable overriding the remote store bucket.
pub const ENV_STORAGE_BUCKET: &str = "SCHOOLDIR_STORAGE_BUCKET";
/// Environment variable overriding the remote store folder.
pub const ENV_STORAGE_FOLDER: &str = "SCHOOLDIR_STORAGE_FOLDER";
/// Environment variable overriding the public base URL of remote images.
pub const ENV_STORAGE_PUBLIC_URL: &str = "SCHOOLDIR_STORAGE_PUBLIC_URL";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub uploads: UploadConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring {ENV_PORT}={port:?}: {e}"),
            }
        }
        if let Some(backend) = lookup(ENV_STORAGE_BACKEND) {
            match backend.trim().to_ascii_lowercase().as_str() {
                "local" if !matches!(self.storage, StorageConfig::Local(_)) => {
                    self.storage = StorageConfig::Local(LocalStorageConfig::default());
                }
                "remote" if !matches!(self.storage, StorageConfig::Remote(_)) => {
                    self.storage = StorageConfig::Remote(RemoteStorageConfig::default());
                }
                "local" | "remote" => {}
                other => tracing::warn!("Ignoring unknown {ENV_STORAGE_BACKEND}={other:?}"),
            }
        }

        // Remote settings apply after the backend switch so an environment-only
        // remote setup is complete.
        let remote_keys = [
            ENV_STORAGE_ENDPOINT,
            ENV_STORAGE_BUCKET,
            ENV_STORAGE_FOLDER,
            ENV_STORAGE_PUBLIC_URL,
        ];
        match &mut self.storage {
            StorageConfig::Remote(remote) => {
                if let Some(endpoint) = lookup(ENV_STORAGE_ENDPOINT).filter(|v| !v.is_empty()) {
                    remote.endpoint = endpoint;
                }
                if let Some(bucket) = lookup(ENV_STORAGE_BUCKET).filter(|v| !v.is_empty()) {
                    remote.bucket = bucket;
                }
                if let Some(folder) = lookup(ENV_STORAGE_FOLDER) {
                    remote.folder = folder;
                }
                if let Some(url) = lookup(ENV_STORAGE_PUBLIC_URL) {
                    remote.public_base_url = Some(url).filter(|v| !v.is_empty());
                }
            }
            StorageConfig::Local(_) => {
                for key in remote_keys {
                    if lookup(key).is_some() {
                        tracing::warn!("Ignoring {key}: storage backend is local");
                    }
                }
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.uploads.max_bytes == 0 {
            warnings.push("uploads.max_bytes is 0; every image will be rejected".into());
        }
        if self.uploads.allowed_types.is_empty() {
            warnings.push("uploads.allowed_types is empty; every image will be rejected".into());
        }
        for ty in &self.uploads.allowed_types {
            if !ty.starts_with("image/") {
                warnings.push(format!("uploads.allowed_types entry '{ty}' is not an image type"));
            }
        }

        match &self.storage {
            StorageConfig::Local(local) => {
                if !local.url_prefix.starts_with('/') {
                    warnings.push(format!(
                        "storage.url_prefix '{}' should start with '/'",
                        local.url_prefix
                    ));
                }
            }
            StorageConfig::Remote(remote) => {
                if remote.endpoint.is_empty() {
                    warnings.push("storage.endpoint is empty for the remote backend".into());
                }
                if remote.bucket.is_empty() {
                    warnings.push("storage.bucket is empty for the remote backend".into());
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            static_dir: None,
            db_path: PathBuf::from("./data/schooldir.db"),
        }
    }
}

/// Limits applied to uploaded images before anything is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_types: vec!["image/jpeg".into(), "image/png".into()],
        }
    }
}

/// Blob storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Local(LocalStorageConfig),
    Remote(RemoteStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local(LocalStorageConfig::default())
    }
}

impl StorageConfig {
    /// Backend name as used in logs and the health response.
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::Local(_) => "local",
            StorageConfig::Remote(_) => "remote",
        }
    }
}

/// Images written to a local directory and served under a URL prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./public/schoolImages"),
            url_prefix: "/schoolImages".into(),
        }
    }
}

/// Images pushed to an S3-style object store over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub folder: String,
    pub public_base_url: Option<String>,
    pub token_env: String,
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            folder: "schools".into(),
            public_base_url: None,
            token_env: "SCHOOLDIR_STORAGE_TOKEN".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.db_path, PathBuf::from("./data/schooldir.db"));
        assert_eq!(cfg.uploads.max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.storage.backend_name(), "local");
    }

    #[test]
    fn default_config_no_warnings() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.uploads.allowed_types, vec!["image/jpeg", "image/png"]);
    }

    #[test]
    fn parse_remote_storage() {
        let json = r#"{
            "storage": {"backend": "remote", "endpoint": "http://minio:9000", "bucket": "media"}
        }"#;
        let cfg = Config::from_json(json).unwrap();
        match cfg.storage {
            StorageConfig::Remote(remote) => {
                assert_eq!(remote.endpoint, "http://minio:9000");
                assert_eq!(remote.bucket, "media");
                assert_eq!(remote.folder, "schools");
                assert_eq!(remote.token_env, "SCHOOLDIR_STORAGE_TOKEN");
            }
            other => panic!("expected remote storage, got {other:?}"),
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let json = r#"{"storage": {"backend": "ftp"}}"#;
        assert!(Config::from_json(json).is_err());
    }

    #[test]
    fn remote_without_endpoint_warns() {
        let mut cfg = Config::default();
        cfg.storage = StorageConfig::Remote(RemoteStorageConfig::default());
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("storage.endpoint")));
        assert!(warnings.iter().any(|w| w.contains("storage.bucket")));
    }

    #[test]
    fn non_image_type_warns() {
        let mut cfg = Config::default();
        cfg.uploads.allowed_types.push("application/pdf".into());
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("application/pdf")));
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_HOST, "127.0.0.1"),
            (ENV_PORT, "8088"),
            (ENV_STORAGE_BACKEND, "remote"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.server.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.storage.backend_name(), "remote");
    }

    #[test]
    fn environment_only_remote_setup() {
        let env: HashMap<&str, &str> = [
            (ENV_STORAGE_BACKEND, "remote"),
            (ENV_STORAGE_ENDPOINT, "http://minio:9000"),
            (ENV_STORAGE_BUCKET, "media"),
            (ENV_STORAGE_FOLDER, "logos"),
            (ENV_STORAGE_PUBLIC_URL, "https://cdn.example.com"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        match &cfg.storage {
            StorageConfig::Remote(remote) => {
                assert_eq!(remote.endpoint, "http://minio:9000");
                assert_eq!(remote.bucket, "media");
                assert_eq!(remote.folder, "logos");
                assert_eq!(remote.public_base_url.as_deref(), Some("https://cdn.example.com"));
            }
            other => panic!("expected remote storage, got {other:?}"),
        }
        assert!(cfg.validate().is_empty(), "unexpected warnings: {:?}", cfg.validate());
    }

    #[test]
    fn remote_overrides_apply_to_file_configured_remote() {
        let mut cfg = Config::from_json(
            r#"{"storage": {"backend": "remote", "endpoint": "http://old", "bucket": "old"}}"#,
        )
        .unwrap();
        cfg.apply_overrides(|k| (k == ENV_STORAGE_BUCKET).then(|| "fresh".to_string()));
        match cfg.storage {
            StorageConfig::Remote(remote) => {
                assert_eq!(remote.endpoint, "http://old");
                assert_eq!(remote.bucket, "fresh");
            }
            other => panic!("expected remote storage, got {other:?}"),
        }
    }

    #[test]
    fn bad_port_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| (k == ENV_PORT).then(|| "not-a-port".to_string()));
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn same_backend_override_keeps_settings() {
        let mut cfg = Config::default();
        cfg.storage = StorageConfig::Local(LocalStorageConfig {
            dir: PathBuf::from("/srv/images"),
            url_prefix: "/img".into(),
        });
        cfg.apply_overrides(|k| (k == ENV_STORAGE_BACKEND).then(|| "local".to_string()));
        match cfg.storage {
            StorageConfig::Local(local) => assert_eq!(local.url_prefix, "/img"),
            other => panic!("expected local storage, got {other:?}"),
        }
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 3000);
    }
}
