//! Application context shared with every route handler via Axum state.

use std::sync::Arc;

use sd_core::config::Config;
use sd_db::pool::DbPool;
use sd_storage::{BlobStore, UploadPolicy};

use crate::records::{SchoolRecords, SqliteSchoolRecords};
use crate::workflow::UpsertWorkflow;

/// Immutable infrastructure behind `Arc`s; cloning is cheap.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
    pub workflow: Arc<UpsertWorkflow>,
}

impl AppContext {
    /// Context backed by the SQLite pool.
    pub fn new(db: DbPool, config: Config, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_records(config, blobs, Arc::new(SqliteSchoolRecords::new(db)))
    }

    /// Context over any record store implementation.
    pub fn with_records(
        config: Config,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn SchoolRecords>,
    ) -> Self {
        let policy = UploadPolicy::from(&config.uploads);
        let workflow = Arc::new(UpsertWorkflow::new(records, blobs.clone(), policy));
        Self {
            config: Arc::new(config),
            blobs,
            workflow,
        }
    }
}
