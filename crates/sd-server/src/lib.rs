//! sd-server: HTTP API for school records.
//!
//! Ties the record store (sd-db) and the image blob store (sd-storage)
//! together behind an Axum router:
//!
//! - `/api/schools` (also `/schools`) CRUD with multipart image uploads
//! - `/health` liveness and `/api-docs` OpenAPI UI
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod form;
pub mod middleware;
pub mod records;
pub mod router;
pub mod routes;
pub mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use sd_core::config::Config;
use tokio::signal;

use crate::context::AppContext;

/// Start the schooldir server.
///
/// Opens (and migrates) the database, builds the blob store, and serves HTTP
/// until a shutdown signal is received.
pub async fn start(config: Config) -> sd_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db = sd_db::pool::init_pool(db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    let blobs = sd_storage::build_blob_store(&config.storage)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sd_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(db, config, Arc::clone(&blobs));
    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sd_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr} (image storage: {})", blobs.backend());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
