use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::pipeline::{BatchResult, Document};
use crate::state::AppState;

/// Multipart field carrying the uploaded documents. May repeat.
pub const FILES_FIELD: &str = "files";

/// POST /extract_skills
/// Accepts `multipart/form-data` with one or more `files` parts and returns
/// one result per file, in upload order.
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, AppError> {
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            debug!(name = ?field.name(), "Skipping unexpected multipart field");
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(multipart_error)?;
        documents.push(Document::new(filename, content));
    }

    if documents.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    info!(files = documents.len(), "Received extraction request");
    Ok(Json(state.orchestrator.process_batch(documents).await))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}
