use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::documents::{extract_text, DocumentError};
use crate::errors::AppError;
use crate::state::AppState;
use crate::whiteboard::extractor::extract_from_resume;
use crate::whiteboard::models::WhiteboardPatch;

struct Upload {
    filename: String,
    bytes: bytes::Bytes,
}

async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, AppError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        uploads.push(Upload { filename, bytes });
    }
    Ok(uploads)
}

async fn extract_off_thread(upload: Upload) -> Result<String, DocumentError> {
    tokio::task::spawn_blocking(move || extract_text(&upload.filename, &upload.bytes))
        .await
        .unwrap_or_else(|e| Err(DocumentError::Worker(e.to_string())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResumeResponse {
    pub file_name: String,
    pub raw_text: String,
    /// Whiteboard fields read from the resume; `{}` when nothing was found.
    pub parsed: WhiteboardPatch,
}

/// POST /api/parse-resume
///
/// Multipart upload of one resume. The text is also run through the resume
/// extractor to pre-fill intent, skills and projects.
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    let upload = read_uploads(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let file_name = upload.filename.clone();
    let raw_text = extract_off_thread(upload)
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;
    info!("Parsed resume {file_name} ({} chars)", raw_text.chars().count());

    let parsed = extract_from_resume(state.llm.as_ref(), &state.models.extraction, &raw_text).await;
    Ok(Json(ParseResumeResponse {
        file_name,
        raw_text,
        parsed,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFilesResponse {
    pub files: Vec<ParsedFile>,
    /// Successfully parsed texts joined in upload order.
    pub raw_text: String,
}

/// POST /api/parse-files
///
/// Multipart upload of several files. A file that cannot be read is reported
/// in its own entry and does not fail the request.
pub async fn handle_parse_files(multipart: Multipart) -> Result<Json<ParseFilesResponse>, AppError> {
    let uploads = read_uploads(multipart).await?;
    if uploads.is_empty() {
        return Err(AppError::Validation("No file uploaded".to_string()));
    }

    let mut files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let file_name = upload.filename.clone();
        match extract_off_thread(upload).await {
            Ok(text) => files.push(ParsedFile {
                file_name,
                raw_text: Some(text),
                error: None,
            }),
            Err(e) => {
                warn!("Could not parse {file_name}: {e}");
                files.push(ParsedFile {
                    file_name,
                    raw_text: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    let raw_text = files
        .iter()
        .filter_map(|f| f.raw_text.as_deref())
        .collect::<Vec<_>>()
        .join("\n\n");
    Ok(Json(ParseFilesResponse { files, raw_text }))
}
