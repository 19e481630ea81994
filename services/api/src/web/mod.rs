pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    http::{HeaderValue, Method, header::{ACCEPT, CONTENT_TYPE}},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use rest::{
    create_text_handler, delete_text_handler, due_lines_handler, get_text_handler,
    health_handler, list_lines_handler, list_texts_handler, next_unreviewed_handler,
    review_line_handler, review_queue_handler, ApiDoc,
};
pub use state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let parsed = HeaderValue::from_str(origin).ok();
        if parsed.is_none() {
            warn!("Ignoring invalid CORS_ORIGIN '{}'", origin);
        }
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
}

/// Builds the full application router, Swagger UI included.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origin);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/texts", get(list_texts_handler).post(create_text_handler))
        .route("/texts/{id}", get(get_text_handler).delete(delete_text_handler))
        .route("/texts/{id}/lines", get(list_lines_handler))
        .route("/texts/{id}/lines/due", get(due_lines_handler))
        .route("/texts/{id}/lines/next-unreviewed", get(next_unreviewed_handler))
        .route("/texts/{id}/queue", get(review_queue_handler))
        .route("/texts/{id}/lines/{line_id}/review", post(review_line_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
