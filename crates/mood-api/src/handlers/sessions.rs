//! Session retrieval, annotated image serving, summary and CSV export.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use mood_models::{write_csv, EmotionSummary, EXPORT_FILE_NAME, EXPORT_MIME};

use crate::error::{ApiError, ApiResult};
use crate::handlers::analyze::{session_response, AnalyzeResponse};
use crate::services::AnalysisSession;
use crate::state::AppState;

async fn load_session(state: &AppState, id: &Uuid) -> ApiResult<Arc<AnalysisSession>> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("session {} not found or expired", id)))
}

/// Fetch the stored analysis for a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let session = load_session(&state, &session_id).await?;
    Ok(Json(session_response(&session)))
}

/// Serve one annotated image as PNG.
pub async fn get_image(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Response> {
    let session = load_session(&state, &session_id).await?;
    let image = session
        .outcome
        .images
        .get(index)
        .ok_or_else(|| ApiError::not_found(format!("image {} not found in session", index)))?;

    Ok((
        [(header::CONTENT_TYPE, "image/png")],
        image.png.clone(),
    )
        .into_response())
}

/// The emotion summary for a session.
///
/// Empty results are a distinct state, not an error from analysis — but
/// there is nothing to summarize, so this surfaces a conflict.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<EmotionSummary>> {
    let session = load_session(&state, &session_id).await?;
    if session.outcome.no_faces() {
        return Err(ApiError::conflict(
            "no faces detected in uploaded images; nothing to summarize",
        ));
    }
    Ok(Json(EmotionSummary::from_table(&session.outcome.table)))
}

/// Download the result table as CSV.
pub async fn export_csv(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = load_session(&state, &session_id).await?;
    if session.outcome.no_faces() {
        return Err(ApiError::conflict(
            "no faces detected in uploaded images; nothing to export",
        ));
    }

    let csv = write_csv(&session.outcome.table)
        .map_err(|e| ApiError::internal(format!("CSV export failed: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}
