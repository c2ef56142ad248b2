// HTTP handlers: object CRUD, render trigger, version

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::AppState;
use crate::bucket_repo::BucketError;
use crate::version::{NAME, VERSION};
use crate::worker;

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// PUT /objects/{key} — create or overwrite an object in the monitored bucket.
/// The resulting mutation event triggers one ingest.
pub(super) async fn put_object_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    match state
        .buckets
        .put_object(&state.render.bucket, &key, &body, content_type)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => bucket_error_response(e),
    }
}

/// GET /objects/{key} — fetch object bytes with the stored content type.
pub(super) async fn get_object_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state.buckets.get_object(&state.render.bucket, &key).await {
        Ok(Some((bytes, content_type))) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "object not found").into_response(),
        Err(e) => bucket_error_response(e),
    }
}

/// DELETE /objects/{key} — idempotent delete.
pub(super) async fn delete_object_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Response {
    match state
        .buckets
        .delete_object(&state.render.bucket, &key)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => bucket_error_response(e),
    }
}

/// GET /plot — the render trigger: window read + all-time max + render +
/// publish, then a JSON summary. Publishes a sparse chart when the window
/// is empty rather than failing.
pub(super) async fn plot_handler(State(state): State<AppState>) -> Response {
    match worker::run_render_cycle(&state.buckets, &state.samples, &state.render).await {
        Ok(summary) => axum::Json(summary).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "run_render_cycle", "render trigger failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("render failed: {}", e)).into_response()
        }
    }
}

fn bucket_error_response(e: BucketError) -> Response {
    match e {
        BucketError::InvalidKey(_) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        BucketError::Io(_) => {
            tracing::warn!(error = %e, "bucket store io error");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
