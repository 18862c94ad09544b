//! Routes for reading and publishing section content.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::content_record::{ContentRecord, ContentSection};
use serde_json::Value;
use services::services::{
    content::ContentService,
    editor::EditorSession,
    storage::SelectedFile,
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /api/content/{section}
/// The section's currently published payload, or null when none exists.
pub async fn get_content(
    State(state): State<AppState>,
    Path(section): Path<ContentSection>,
) -> Result<ResponseJson<ApiResponse<Option<ContentRecord>>>, ApiError> {
    let record = ContentService::current(state.content.as_ref(), section).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// POST /api/content/{section}
/// Validate and persist a full payload for the section.
pub async fn publish_content(
    State(state): State<AppState>,
    Path(section): Path<ContentSection>,
    axum::Json(payload): axum::Json<Value>,
) -> Result<ResponseJson<ApiResponse<ContentRecord>>, ApiError> {
    let record = ContentService::publish(state.content.as_ref(), section, payload).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// POST /api/content/{section}/submit
/// One-shot form submit: a `payload` JSON part plus file parts named by the
/// field path they replace. Runs the full upload/save/cleanup protocol.
pub async fn submit_content(
    State(state): State<AppState>,
    Path(section): Path<ContentSection>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<ContentRecord>>, ApiError> {
    let session = EditorSession::new(section, state.content.clone(), state.store.clone());
    session.load().await?;

    let mut saw_payload = false;
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "payload" {
            let text = field.text().await?;
            let payload: Value = serde_json::from_str(&text)
                .map_err(|e| ApiError::BadRequest(format!("invalid payload JSON: {e}")))?;
            session.replace_draft(payload);
            saw_payload = true;
        } else {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            session.stage_file(
                &name,
                SelectedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                },
            )?;
        }
    }
    if !saw_payload {
        return Err(ApiError::BadRequest("missing `payload` part".to_string()));
    }

    let outcome = session.save().await?;
    Ok(ResponseJson(ApiResponse::success(outcome.record)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/content/{section}",
        Router::new()
            .route("/", get(get_content).post(publish_content))
            .route("/submit", post(submit_content)),
    )
}
