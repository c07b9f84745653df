//! Batch upload and analysis handler.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use mood_models::{EmotionSummary, FaceResult};
use mood_vision::{process_batch, SkippedImage, UploadedImage};

use crate::error::{ApiError, ApiResult};
use crate::services::AnalysisSession;
use crate::state::AppState;

/// File extensions accepted for upload, matched case-insensitively.
const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One processed image in a session, as reported to the client.
#[derive(Serialize)]
pub struct ImageSummary {
    pub file_name: String,
    pub face_count: usize,
    pub width: u32,
    pub height: u32,
    /// Where the annotated PNG is served
    pub url: String,
}

/// The full result of one analysis session.
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub images: Vec<ImageSummary>,
    /// All face rows, in upload order then detection order
    pub faces: Vec<FaceResult>,
    /// Uploads that could not be processed
    pub skipped: Vec<SkippedImage>,
    /// Emotion counts, descending, ties by label
    pub summary: EmotionSummary,
    /// True when no face was found in any processed image
    pub no_faces: bool,
    /// CSV download location; absent while there is nothing to export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_url: Option<String>,
}

/// Build the client-facing view of a stored session.
pub(crate) fn session_response(session: &AnalysisSession) -> AnalyzeResponse {
    let outcome = &session.outcome;

    let images = outcome
        .images
        .iter()
        .enumerate()
        .map(|(index, image)| ImageSummary {
            file_name: image.file_name.clone(),
            face_count: image.face_count,
            width: image.width,
            height: image.height,
            url: format!("/api/sessions/{}/images/{}", session.id, index),
        })
        .collect();

    let no_faces = outcome.no_faces();
    let export_url = (!no_faces).then(|| format!("/api/sessions/{}/export", session.id));

    AnalyzeResponse {
        session_id: session.id,
        created_at: session.created_at,
        images,
        faces: outcome.table.rows().to_vec(),
        skipped: outcome.skipped.clone(),
        summary: EmotionSummary::from_table(&outcome.table),
        no_faces,
        export_url,
    }
}

fn has_accepted_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.iter().any(|accepted| *accepted == ext)
        })
        .unwrap_or(false)
}

/// Analyze a batch of uploaded photos.
///
/// Accepts one or more JPEG/PNG files as multipart fields, runs the
/// detection pipeline over them sequentially, stores the outcome in a new
/// session and returns the full result.
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let mut uploads = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart payload: {}", e)))?
    {
        // Non-file fields are ignored
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        if !has_accepted_extension(&file_name) {
            rejected.push(SkippedImage {
                file_name,
                reason: "unsupported file type (expected .jpg, .jpeg or .png)".to_string(),
            });
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {}", e)))?;
        uploads.push(UploadedImage::new(file_name, bytes.to_vec()));
    }

    if uploads.is_empty() && rejected.is_empty() {
        return Err(ApiError::bad_request("no files uploaded"));
    }

    // Decode/detect/draw is CPU-bound; keep it off the runtime workers.
    let detector = Arc::clone(&state.detector);
    let mut outcome = tokio::task::spawn_blocking(move || process_batch(detector.as_ref(), uploads))
        .await
        .map_err(|e| ApiError::internal(format!("analysis task failed: {}", e)))?;
    outcome.skipped.extend(rejected);

    let session = state.sessions.insert(outcome).await;

    info!(
        session_id = %session.id,
        images = session.outcome.images.len(),
        faces = session.outcome.table.len(),
        skipped = session.outcome.skipped.len(),
        "Batch analyzed"
    );

    Ok(Json(session_response(&session)))
}
