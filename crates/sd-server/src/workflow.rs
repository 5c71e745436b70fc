//! Create, update and delete schools together with their images.
//!
//! A school and its image live in two independent stores. [`UpsertWorkflow`]
//! orders the two writes and cleans up after partial failures:
//!
//! - create stores the image first; if the record insert then fails, the
//!   image is deleted again (attempted once, failure only logged).
//! - update with a new image drops the old image best-effort, stores the new
//!   one and points the record at it in a single update.
//! - delete removes the record first; the image delete afterwards never
//!   fails the request.

use std::sync::Arc;

use sd_core::{Error, Result, SchoolFields, SchoolId, SchoolPatch};
use sd_db::models::School;
use sd_storage::{BlobStore, ImageUpload, UploadPolicy};

use crate::records::SchoolRecords;

pub struct UpsertWorkflow {
    records: Arc<dyn SchoolRecords>,
    blobs: Arc<dyn BlobStore>,
    policy: UploadPolicy,
}

impl UpsertWorkflow {
    pub fn new(
        records: Arc<dyn SchoolRecords>,
        blobs: Arc<dyn BlobStore>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            records,
            blobs,
            policy,
        }
    }

    pub async fn list(&self) -> Result<Vec<School>> {
        self.records.list().await
    }

    pub async fn get(&self, id: SchoolId) -> Result<School> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("school", id))
    }

    pub async fn create(&self, fields: SchoolFields, image: Option<ImageUpload>) -> Result<School> {
        let upload = image.ok_or_else(|| Error::Validation("Image is required".into()))?;
        self.policy.check(&upload)?;

        let stored = self.blobs.put(&upload).await?;

        match self.records.insert(fields, stored.clone()).await {
            Ok(school) => {
                tracing::info!(id = %school.id, image = %stored.key, "School created");
                Ok(school)
            }
            Err(e) => {
                tracing::warn!(
                    image = %stored.key,
                    error = %e,
                    "Record insert failed; removing stored image"
                );
                self.discard_blob(&stored.key).await;
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        id: SchoolId,
        patch: SchoolPatch,
        image: Option<ImageUpload>,
    ) -> Result<School> {
        if let Some(upload) = &image {
            self.policy.check(upload)?;
        }

        let existing = self.get(id).await?;

        let Some(upload) = image else {
            if patch.is_empty() {
                return Ok(existing);
            }
            let updated = self
                .records
                .update(id, patch, None)
                .await?
                .ok_or_else(|| Error::not_found("school", id))?;
            tracing::info!(%id, "School updated");
            return Ok(updated);
        };

        self.discard_blob(&existing.image_key).await;
        let stored = self.blobs.put(&upload).await?;

        match self.records.update(id, patch, Some(stored.clone())).await {
            Ok(Some(updated)) => {
                tracing::info!(%id, image = %stored.key, "School updated with new image");
                Ok(updated)
            }
            Ok(None) => {
                self.discard_blob(&stored.key).await;
                Err(Error::not_found("school", id))
            }
            Err(e) => {
                tracing::warn!(
                    %id,
                    image = %stored.key,
                    error = %e,
                    "Record update failed after storing new image; image may be orphaned"
                );
                Err(e)
            }
        }
    }

    /// Delete a school and, best-effort, its image. Returns the deleted record.
    pub async fn delete(&self, id: SchoolId) -> Result<School> {
        let existing = self.get(id).await?;

        if !self.records.delete(id).await? {
            return Err(Error::not_found("school", id));
        }
        tracing::info!(%id, "School deleted");

        self.discard_blob(&existing.image_key).await;
        Ok(existing)
    }

    /// Delete a blob, logging instead of returning failures.
    async fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key).await {
            tracing::warn!(
                backend = self.blobs.backend(),
                key,
                error = %e,
                "Failed to delete image"
            );
        }
    }
}
