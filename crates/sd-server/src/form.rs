//! Multipart form parsing for school create/update requests.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use sd_core::{Error, RawFields, Result};
use sd_storage::ImageUpload;

/// Name of the file part carrying the school image.
pub const IMAGE_FIELD: &str = "image";

/// Text fields and the optional image of a submitted form.
#[derive(Debug, Default)]
pub struct SchoolForm {
    pub fields: RawFields,
    pub image: Option<ImageUpload>,
}

impl SchoolForm {
    /// Read every part of a multipart body.
    ///
    /// An empty file part counts as "no image": browsers send one when the
    /// file input is left blank. Unknown text fields are ignored.
    pub async fn from_multipart(
        multipart: std::result::Result<Multipart, MultipartRejection>,
    ) -> Result<Self> {
        let mut multipart = multipart.map_err(|e| {
            Error::Validation(format!("Expected a multipart/form-data body: {}", e.body_text()))
        })?;

        let mut form = SchoolForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await.map_err(bad_form)?;
                if bytes.is_empty() {
                    continue;
                }
                if form.image.is_some() {
                    return Err(Error::Validation("Only one image may be uploaded".into()));
                }
                form.image = Some(ImageUpload::new(file_name, content_type, bytes));
            } else {
                let value = field.text().await.map_err(bad_form)?;
                if !form.fields.set(&name, value) {
                    tracing::debug!(field = %name, "Ignoring unknown form field");
                }
            }
        }

        Ok(form)
    }
}

fn bad_form(e: MultipartError) -> Error {
    Error::Validation(format!("Invalid multipart form: {}", e.body_text()))
}
