pub mod auth;
pub mod cleanup;
pub mod error;
pub mod generate;
pub mod media;
pub mod middleware;
pub mod pages;
pub mod render;
pub mod sections;
pub mod state;
pub mod storage;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::storage::MEDIA_ROUTE;

/// Room for multipart framing and text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Request span without the query string; the preview route may carry a
/// session token there.
fn request_span(req: &Request) -> tracing::Span {
    tracing::debug_span!("request", method = %req.method(), path = %req.uri().path())
}

/// Builds the full application: JSON API, rendered pages and stored media.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/public/{username}", get(render::public_page_json))
        .route("/u/{username}", get(render::public_page))
        .route("/dashboard/preview", get(render::preview))
        .route("/login", get(render::login_page))
        .route("/health", get(|| async { "ok" }));

    let protected_routes = Router::new()
        .route("/api/page", get(pages::get_page))
        .route("/api/page/settings", put(pages::update_settings))
        .route("/api/page/publish", put(pages::set_publish))
        .route(
            "/api/page/sections/{kind}",
            get(sections::list_sections).post(sections::create_section),
        )
        .route(
            "/api/page/sections/{kind}/{id}",
            put(sections::update_section).delete(sections::delete_section),
        )
        .route("/api/page/order/{kind}", put(sections::reorder_sections))
        .route("/api/page/uploads/{kind}", post(sections::upload_and_create))
        .route("/api/media", post(media::upload_media))
        .route("/api/generate/message", post(generate::generate_message))
        .route("/api/generate/poem", post(generate::generate_poem))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(MEDIA_ROUTE, ServeDir::new(state.storage.dir()))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}
