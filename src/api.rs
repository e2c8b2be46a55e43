use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;

use crate::error::ResolveError;
use crate::frame::Frame;
use crate::resolver::ScreenStateResolver;

/// Full-resolution PNG captures exceed axum's 2 MiB default.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub fn router(
    auth_token: String,
    reference_dir: PathBuf,
    resolver: Arc<ScreenStateResolver>,
) -> Router {
    Router::new()
        .route("/classify", post(classify_frame))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_FRAME_BYTES))
        .with_state(ApiState {
            auth_token: Arc::from(auth_token),
            reference_dir: Arc::new(reference_dir),
            resolver,
        })
}

#[derive(Clone)]
struct ApiState {
    auth_token: Arc<str>,
    reference_dir: Arc<PathBuf>,
    resolver: Arc<ScreenStateResolver>,
}

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if let Some(token) = auth.strip_prefix("Bearer ")
        && token == expected_token
    {
        return Ok(());
    }

    Err(StatusCode::UNAUTHORIZED)
}

fn status_for(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::DecodeFailure(_) => StatusCode::BAD_REQUEST,
        ResolveError::NoReferenceImages { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ResolveError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Classify the encoded image in the request body.
async fn classify_frame(
    State(api): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    check_auth(&headers, &api.auth_token)?;

    let resolver = api.resolver.clone();
    let reference_dir = api.reference_dir.clone();

    // OCR and correlation are blocking and CPU-bound.
    let result = tokio::task::spawn_blocking(move || {
        let frame = Frame::decode(&body)?;
        resolver.resolve_screen_state(&frame, &reference_dir)
    })
    .await
    .map_err(|e| {
        tracing::error!("classification task failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match result {
        Ok(resolution) => Ok(Json(resolution)),
        Err(e) => {
            tracing::error!("classification failed: {e}");
            Err(status_for(&e))
        }
    }
}
