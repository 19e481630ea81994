//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    CreateTextRequest, CreateTextResponse, LineView, Outcome, ReviewRequest, ReviewResponse,
    TextView,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use line_by_line_core::ports::RecordStore;
use line_by_line_core::{ingestion, progression, selector, CoreError, Line, PortError, Text};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

type HandlerError = (StatusCode, String);

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        create_text_handler,
        list_texts_handler,
        get_text_handler,
        delete_text_handler,
        list_lines_handler,
        due_lines_handler,
        next_unreviewed_handler,
        review_queue_handler,
        review_line_handler,
    ),
    components(
        schemas(
            CreateTextRequest,
            CreateTextResponse,
            TextView,
            LineView,
            Outcome,
            ReviewRequest,
            ReviewResponse,
        )
    ),
    tags(
        (name = "Line by Line API", description = "Spaced-repetition review of texts, one line at a time.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a core failure onto an HTTP status, logging it on the way out.
fn error_response(context: &str, e: CoreError) -> HandlerError {
    let status = match &e {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) | CoreError::Storage(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        CoreError::Storage(PortError::Conflict(_)) => StatusCode::CONFLICT,
        CoreError::Storage(PortError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Storage(PortError::Unexpected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("{}: {:?}", context, e);
        (status, context.to_string())
    } else {
        warn!("{}: {}", context, e);
        (status, e.to_string())
    }
}

async fn require_text(store: &dyn RecordStore, text_id: Uuid) -> Result<Text, HandlerError> {
    store
        .get_text(text_id)
        .await
        .map_err(|e| error_response("Failed to load text", e.into()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Text {} not found", text_id)))
}

fn line_views(lines: Vec<Line>) -> Json<Vec<LineView>> {
    Json(lines.into_iter().map(LineView::from).collect())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Create a new text; its non-blank lines become reviewable lines.
#[utoipa::path(
    post,
    path = "/texts",
    request_body = CreateTextRequest,
    responses(
        (status = 201, description = "Text created successfully", body = CreateTextResponse),
        (status = 400, description = "Blank title or content"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_text_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreateTextRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let text_id = ingestion::ingest_text(
        app_state.store.as_ref(),
        &request.title,
        request.author.as_deref(),
        &request.content,
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("Failed to create text", e))?;

    info!(%text_id, "Created text via API");
    Ok((StatusCode::CREATED, Json(CreateTextResponse { text_id })))
}

/// List all texts, newest first.
#[utoipa::path(
    get,
    path = "/texts",
    responses((status = 200, description = "All texts", body = [TextView]))
)]
pub async fn list_texts_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TextView>>, HandlerError> {
    let texts = app_state
        .store
        .list_texts()
        .await
        .map_err(|e| error_response("Failed to list texts", e.into()))?;
    Ok(Json(texts.into_iter().map(TextView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/texts/{id}",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 200, description = "The text", body = TextView),
        (status = 404, description = "No such text")
    )
)]
pub async fn get_text_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<Json<TextView>, HandlerError> {
    let text = require_text(app_state.store.as_ref(), text_id).await?;
    Ok(Json(text.into()))
}

/// Delete a text together with all of its lines.
#[utoipa::path(
    delete,
    path = "/texts/{id}",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 204, description = "Text and lines deleted"),
        (status = 404, description = "No such text")
    )
)]
pub async fn delete_text_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let store = app_state.store.as_ref();
    require_text(store, text_id).await?;
    ingestion::delete_text_and_lines(store, text_id)
        .await
        .map_err(|e| error_response("Failed to delete text", e))?;
    info!(%text_id, "Deleted text via API");
    Ok(StatusCode::NO_CONTENT)
}

/// Every line of the text in order.
#[utoipa::path(
    get,
    path = "/texts/{id}/lines",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 200, description = "Lines ordered by line number", body = [LineView]),
        (status = 404, description = "No such text")
    )
)]
pub async fn list_lines_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<Json<Vec<LineView>>, HandlerError> {
    let store = app_state.store.as_ref();
    require_text(store, text_id).await?;
    let lines = selector::all_lines(store, text_id)
        .await
        .map_err(|e| error_response("Failed to load lines", e.into()))?;
    Ok(line_views(lines))
}

/// Lines due now, regardless of the unlock gate.
#[utoipa::path(
    get,
    path = "/texts/{id}/lines/due",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 200, description = "Due lines ordered by line number", body = [LineView]),
        (status = 404, description = "No such text")
    )
)]
pub async fn due_lines_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<Json<Vec<LineView>>, HandlerError> {
    let store = app_state.store.as_ref();
    require_text(store, text_id).await?;
    let lines = selector::due_lines(store, text_id, Utc::now())
        .await
        .map_err(|e| error_response("Failed to load due lines", e.into()))?;
    Ok(line_views(lines))
}

/// The lowest-numbered line never reviewed, or `null`.
#[utoipa::path(
    get,
    path = "/texts/{id}/lines/next-unreviewed",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 200, description = "The line, or null when every line was reviewed", body = LineView),
        (status = 404, description = "No such text")
    )
)]
pub async fn next_unreviewed_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<Json<Option<LineView>>, HandlerError> {
    let store = app_state.store.as_ref();
    require_text(store, text_id).await?;
    let line = selector::next_unreviewed_line(store, text_id)
        .await
        .map_err(|e| error_response("Failed to load next unreviewed line", e.into()))?;
    Ok(Json(line.map(LineView::from)))
}

/// Due lines within the unlock gate: what the learner should review now.
#[utoipa::path(
    get,
    path = "/texts/{id}/queue",
    params(("id" = Uuid, Path, description = "Text id")),
    responses(
        (status = 200, description = "Reviewable lines ordered by line number", body = [LineView]),
        (status = 404, description = "No such text")
    )
)]
pub async fn review_queue_handler(
    State(app_state): State<Arc<AppState>>,
    Path(text_id): Path<Uuid>,
) -> Result<Json<Vec<LineView>>, HandlerError> {
    let lines = progression::reviewable_lines(app_state.store.as_ref(), text_id, Utc::now())
        .await
        .map_err(|e| error_response("Failed to build review queue", e))?;
    Ok(line_views(lines))
}

/// Record a remembered/forgotten outcome for one line.
#[utoipa::path(
    post,
    path = "/texts/{id}/lines/{line_id}/review",
    params(
        ("id" = Uuid, Path, description = "Text id"),
        ("line_id" = Uuid, Path, description = "Line id")
    ),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Updated line and any newly unlocked line", body = ReviewResponse),
        (status = 400, description = "Line is still locked"),
        (status = 404, description = "No such text or line")
    )
)]
pub async fn review_line_handler(
    State(app_state): State<Arc<AppState>>,
    Path((text_id, line_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, HandlerError> {
    let report = progression::record_review(
        app_state.store.as_ref(),
        text_id,
        line_id,
        request.outcome.into(),
        Utc::now(),
    )
    .await
    .map_err(|e| error_response("Failed to record review", e))?;
    Ok(Json(report.into()))
}
