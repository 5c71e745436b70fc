//! Async access to school records.
//!
//! [`SchoolRecords`] is the seam between the upsert workflow and the SQLite
//! record store, so the workflow can be exercised against in-memory fakes.

use async_trait::async_trait;
use rusqlite::Connection;
use sd_core::{Error, ImageRef, Result, SchoolFields, SchoolId, SchoolPatch};
use sd_db::models::School;
use sd_db::pool::{get_conn, DbPool};
use sd_db::queries::schools;

/// Record store operations used by the workflow.
#[async_trait]
pub trait SchoolRecords: Send + Sync {
    async fn list(&self) -> Result<Vec<School>>;
    async fn get(&self, id: SchoolId) -> Result<Option<School>>;
    async fn insert(&self, fields: SchoolFields, image: ImageRef) -> Result<School>;
    async fn update(
        &self,
        id: SchoolId,
        patch: SchoolPatch,
        image: Option<ImageRef>,
    ) -> Result<Option<School>>;
    async fn delete(&self, id: SchoolId) -> Result<bool>;
}

/// [`SchoolRecords`] backed by the SQLite pool.
///
/// Each call runs on the blocking thread pool with one pooled connection,
/// which goes back to the pool when the call returns or fails.
#[derive(Clone)]
pub struct SqliteSchoolRecords {
    pool: DbPool,
}

impl SqliteSchoolRecords {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task failed: {e}")))?
    }
}

#[async_trait]
impl SchoolRecords for SqliteSchoolRecords {
    async fn list(&self) -> Result<Vec<School>> {
        self.with_conn(schools::list_schools).await
    }

    async fn get(&self, id: SchoolId) -> Result<Option<School>> {
        self.with_conn(move |conn| schools::get_school(conn, id)).await
    }

    async fn insert(&self, fields: SchoolFields, image: ImageRef) -> Result<School> {
        self.with_conn(move |conn| schools::create_school(conn, &fields, &image))
            .await
    }

    async fn update(
        &self,
        id: SchoolId,
        patch: SchoolPatch,
        image: Option<ImageRef>,
    ) -> Result<Option<School>> {
        self.with_conn(move |conn| schools::update_school(conn, id, &patch, image.as_ref()))
            .await
    }

    async fn delete(&self, id: SchoolId) -> Result<bool> {
        self.with_conn(move |conn| schools::delete_school(conn, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::Contact;
    use sd_db::pool::init_memory_pool;

    fn fields() -> SchoolFields {
        SchoolFields {
            name: "Oak Hill".into(),
            address: "1 Elm St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            contact: Contact::parse("5551234567").unwrap(),
            email_id: "x@y.com".into(),
        }
    }

    #[tokio::test]
    async fn round_trip_through_blocking_pool() {
        let records = SqliteSchoolRecords::new(init_memory_pool().unwrap());
        let image = ImageRef {
            url: "/schoolImages/1-a.png".into(),
            key: "1-a.png".into(),
        };

        let created = records.insert(fields(), image).await.unwrap();
        assert_eq!(records.get(created.id).await.unwrap().unwrap(), created);
        assert_eq!(records.list().await.unwrap().len(), 1);

        let patch = SchoolPatch {
            state: Some("WI".into()),
            ..Default::default()
        };
        let updated = records.update(created.id, patch, None).await.unwrap().unwrap();
        assert_eq!(updated.state, "WI");

        assert!(records.delete(created.id).await.unwrap());
        assert!(records.get(created.id).await.unwrap().is_none());
    }
}
