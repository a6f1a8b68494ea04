use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    let mut router = Router::new()
        // Documents
        .route("/documents", get(handlers::list_documents))
        .route(
            "/documents",
            post(handlers::create_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/mine", get(handlers::list_my_documents))
        .route("/documents/:id", get(handlers::get_document))
        .route(
            "/documents/:id",
            put(handlers::update_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/:id", delete(handlers::delete_document))
        // Review
        .route("/documents/:id/approval", put(handlers::set_approval))
        .route("/documents/:id/toggle-active", put(handlers::toggle_active))
        .route("/documents/:id/status", put(handlers::set_lifecycle))
        // Files
        .route("/download", get(handlers::download))
        // Maintenance
        .route("/admin/orphans/sweep", post(handlers::sweep_orphans))
        .route("/_internal/health", get(handlers::health));

    // The local backend serves its own signed links
    if state.local_objects.is_some() {
        router = router.route("/objects/*key", get(handlers::serve_object));
    }

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    let router = router.layer(TraceLayer::new_for_http());
    let router = match cors_layer(&state.config.server.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

/// `None` when no origins are configured, so cross-origin calls stay blocked.
fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ]);

    if allowed_origins.iter().any(|o| o == "*") {
        return Some(base.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(base.allow_origin(AllowOrigin::list(origins)))
}
