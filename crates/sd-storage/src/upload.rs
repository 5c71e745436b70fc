//! Uploaded image payloads and the checks applied before storing them.

use bytes::Bytes;
use image::ImageFormat;
use sd_core::config::UploadConfig;
use sd_core::{Error, Result};

/// An image file received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client (untrusted).
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The declared content type in canonical form, e.g. `image/jpg` becomes `image/jpeg`.
    pub fn mime_type(&self) -> String {
        normalize_mime(&self.content_type)
    }
}

/// Size and type limits for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl From<&UploadConfig> for UploadPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            allowed_types: config.allowed_types.clone(),
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl UploadPolicy {
    /// Validate an upload. Nothing is written anywhere.
    pub fn check(&self, upload: &ImageUpload) -> Result<()> {
        if upload.is_empty() {
            return Err(Error::Validation("Image is required".into()));
        }

        if upload.len() as u64 > self.max_bytes {
            return Err(Error::Validation(format!(
                "Image must be at most {} bytes (got {})",
                self.max_bytes,
                upload.len()
            )));
        }

        let declared = upload.mime_type();
        if !self
            .allowed_types
            .iter()
            .any(|t| normalize_mime(t) == declared)
        {
            return Err(Error::Validation(
                "Only JPEG or PNG images are allowed".into(),
            ));
        }

        let detected = image::guess_format(&upload.bytes)
            .ok()
            .map(|format: ImageFormat| format.to_mime_type());
        if detected != Some(declared.as_str()) {
            return Err(Error::Validation(format!(
                "Image content does not match declared type {declared}"
            )));
        }

        Ok(())
    }
}

/// Lowercase, drop parameters, and fold the non-standard `image/jpg` alias.
fn normalize_mime(raw: &str) -> String {
    let base = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match base.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => base,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    pub(crate) const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];
    const GIF_MAGIC: &[u8] = b"GIF89a\x01\x00\x01\x00";

    #[test]
    fn accepts_png_and_jpeg() {
        let policy = UploadPolicy::default();
        policy
            .check(&ImageUpload::new("a.png", "image/png", PNG_MAGIC))
            .unwrap();
        policy
            .check(&ImageUpload::new("a.jpg", "image/jpeg", JPEG_MAGIC))
            .unwrap();
        policy
            .check(&ImageUpload::new("a.jpg", "image/jpg", JPEG_MAGIC))
            .unwrap();
    }

    #[test]
    fn rejects_empty() {
        let err = UploadPolicy::default()
            .check(&ImageUpload::new("a.png", "image/png", Bytes::new()))
            .unwrap_err();
        assert!(err.to_string().contains("Image is required"));
    }

    #[test]
    fn rejects_gif() {
        let err = UploadPolicy::default()
            .check(&ImageUpload::new("a.gif", "image/gif", GIF_MAGIC))
            .unwrap_err();
        assert!(err.to_string().contains("Only JPEG or PNG images are allowed"));
    }

    #[test]
    fn rejects_oversize() {
        let policy = UploadPolicy {
            max_bytes: 8,
            ..UploadPolicy::default()
        };
        let err = policy
            .check(&ImageUpload::new("a.png", "image/png", PNG_MAGIC))
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn exact_limit_is_allowed() {
        let policy = UploadPolicy {
            max_bytes: PNG_MAGIC.len() as u64,
            ..UploadPolicy::default()
        };
        policy
            .check(&ImageUpload::new("a.png", "image/png", PNG_MAGIC))
            .unwrap();
    }

    #[test]
    fn rejects_mismatched_content() {
        let err = UploadPolicy::default()
            .check(&ImageUpload::new("a.png", "image/png", GIF_MAGIC))
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));

        assert!(UploadPolicy::default()
            .check(&ImageUpload::new("a.png", "image/jpeg", PNG_MAGIC))
            .is_err());
    }
}
