//! Axum router construction.
//!
//! Builds the full application router with the school routes, health check,
//! API docs, middleware layers, and static file serving.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use sd_core::config::StorageConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Slack on top of `uploads.max_bytes` for multipart framing and text fields.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::schools::list_schools,
        routes::schools::create_school,
        routes::schools::update_school,
        routes::schools::delete_school,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::schools::SchoolResponse,
        routes::schools::CreatedResponse,
        routes::schools::UpdatedResponse,
        routes::schools::MessageResponse,
        routes::schools::SchoolFormBody,
        crate::error::ErrorResponse,
    ))
)]
struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(ctx.config.uploads.max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let schools = Router::new()
        .route(
            "/schools",
            get(routes::schools::list_schools)
                .post(routes::schools::create_school)
                .put(routes::schools::update_school)
                .delete(routes::schools::delete_school),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", schools.clone())
        .merge(schools)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Stored images are plain files under the local backend's URL prefix.
    if let StorageConfig::Local(local) = &ctx.config.storage {
        let prefix = local.url_prefix.trim_end_matches('/');
        if prefix.starts_with('/') && prefix.len() > 1 {
            app = app.nest_service(prefix, ServeDir::new(&local.dir));
        } else {
            tracing::warn!(
                "storage.url_prefix '{}' cannot be mounted; stored images will not be served",
                local.url_prefix
            );
        }
    }

    let static_dir = ctx.config.server.static_dir.clone();

    let mut app = app
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for a front-end build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}
