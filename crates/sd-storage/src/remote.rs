//! Blob store backed by an S3-style object store reachable over HTTP.
//!
//! Objects are written with `PUT {endpoint}/{bucket}/{folder}/{id}` and
//! removed with `DELETE` on the same URL. A bearer token is attached when
//! configured. Every call is attempted once.

use async_trait::async_trait;
use reqwest::Client;
use sd_core::config::RemoteStorageConfig;
use sd_core::{Error, ImageRef, Result};

use crate::naming::{remote_id, UniqueStamp};
use crate::upload::ImageUpload;
use crate::BlobStore;

const BACKEND: &str = "remote";

/// HTTP object store client.
pub struct RemoteBlobStore {
    endpoint: String,
    bucket: String,
    folder: String,
    public_base_url: Option<String>,
    bearer_token: Option<String>,
    client: Client,
    stamp: UniqueStamp,
}

impl RemoteBlobStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into().trim_matches('/').to_string(),
            folder: String::new(),
            public_base_url: None,
            bearer_token: None,
            client: Client::new(),
            stamp: UniqueStamp::new(),
        }
    }

    /// Build from config. `bearer_token` is the value of the variable named by
    /// `token_env`, resolved by the caller.
    pub fn from_config(config: &RemoteStorageConfig, bearer_token: Option<String>) -> Self {
        Self::new(&config.endpoint, &config.bucket)
            .with_folder(&config.folder)
            .with_public_base_url(config.public_base_url.clone())
            .with_bearer_token(bearer_token)
    }

    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into().trim_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url
            .map(|x| x.trim_end_matches('/').to_string())
            .filter(|x| !x.is_empty());
        self
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    fn key_for(&self, id: &str) -> String {
        if self.folder.is_empty() {
            id.to_string()
        } else {
            format!("{}/{id}", self.folder)
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.bucket,
            key.trim_start_matches('/')
        )
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => self.object_url(key),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl BlobStore for RemoteBlobStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn put(&self, upload: &ImageUpload) -> Result<ImageRef> {
        let key = self.key_for(&remote_id(self.stamp.next(), &upload.file_name));
        let url = self.object_url(&key);

        let resp = self
            .authorize(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, upload.mime_type())
            .body(upload.bytes.clone())
            .send()
            .await
            .map_err(|e| Error::storage(BACKEND, format!("upload to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::storage(
                BACKEND,
                format!("upload to {url} failed: {}", resp.status()),
            ));
        }

        tracing::debug!(%url, bytes = upload.len(), "Uploaded image");

        Ok(ImageRef {
            url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.object_url(key);
        let resp = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::storage(BACKEND, format!("delete of {url} failed: {e}")))?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(%url, %status, "Deleted image");
            Ok(())
        } else {
            Err(Error::storage(
                BACKEND,
                format!("delete of {url} failed: {status}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::tests::{JPEG_MAGIC, PNG_MAGIC};
    use wiremock::matchers::{body_bytes, header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RemoteBlobStore {
        RemoteBlobStore::new(server.uri(), "media")
            .with_folder("schools")
            .with_bearer_token(Some("secret".into()))
    }

    #[tokio::test]
    async fn put_uploads_with_token_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/media/schools/\d+-logo$"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "image/png"))
            .and(body_bytes(PNG_MAGIC.to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let stored = store(&server)
            .put(&ImageUpload::new("logo.png", "image/png", PNG_MAGIC))
            .await
            .unwrap();

        assert!(stored.key.starts_with("schools/"));
        assert!(stored.key.ends_with("-logo"));
        assert_eq!(stored.url, format!("{}/media/{}", server.uri(), stored.key));
    }

    #[tokio::test]
    async fn put_sends_canonical_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let store = store(&server);
        store
            .put(&ImageUpload::new("logo.jpg", "image/jpg", JPEG_MAGIC))
            .await
            .unwrap();
        store
            .put(&ImageUpload::new("crest.jpg", "Image/JPEG; charset=x", JPEG_MAGIC))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn public_base_url_is_used_for_links() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let stored = store(&server)
            .with_public_base_url(Some("https://cdn.example.com/".into()))
            .put(&ImageUpload::new("logo.png", "image/png", PNG_MAGIC))
            .await
            .unwrap();
        assert_eq!(stored.url, format!("https://cdn.example.com/{}", stored.key));
    }

    #[tokio::test]
    async fn put_failure_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server)
            .put(&ImageUpload::new("logo.png", "image/png", PNG_MAGIC))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[tokio::test]
    async fn delete_treats_missing_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path_regex(r"^/media/schools/1-gone$"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).delete("schools/1-gone").await.unwrap();
    }

    #[tokio::test]
    async fn delete_failure_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(store(&server).delete("schools/1-x").await.is_err());
    }
}
