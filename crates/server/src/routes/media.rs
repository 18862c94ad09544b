//! Routes for standalone media upload and deletion.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::content_record::ContentSection;
use serde::{Deserialize, Serialize};
use services::services::{
    media,
    storage::{SelectedFile, unique_object_name, validate_upload},
};
use tracing::warn;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, TS)]
pub struct UploadResponse {
    pub image_path: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct DeleteImageRequest {
    pub image_path: String,
}

/// POST /api/content/{section}/upload
/// Store a file under a fresh object name; when `old_image_path` names a
/// bare stored object, it is deleted after the new object is in place.
pub async fn upload_media(
    State(state): State<AppState>,
    Path(section): Path<ContentSection>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<UploadResponse>>, ApiError> {
    let mut file: Option<SelectedFile> = None;
    let mut old_image_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                file = Some(SelectedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("old_image_path") => old_image_path = Some(field.text().await?),
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err(ApiError::BadRequest("missing `file` part".to_string()));
    };
    validate_upload(&file, section.allowed_mime_types())?;

    let bucket = section.bucket();
    let name = unique_object_name(&file.file_name);
    state
        .store
        .put(bucket, &name, &file.bytes, &file.content_type)
        .await?;

    // the new object is live before the replaced one goes away
    if let Some(old) = old_image_path.filter(|o| media::is_bare_object_name(o)) {
        if let Err(e) = state.store.remove(bucket, &[old.clone()]).await {
            warn!(bucket, old = old.as_str(), error = %e, "failed to delete replaced media");
        }
    }

    let public_url = state.store.public_url(bucket, &name);
    Ok(ResponseJson(ApiResponse::success(UploadResponse {
        image_path: name,
        public_url,
    })))
}

/// POST /api/content/{section}/delete-image
/// Remove a stored object by bare name. URLs are rejected; they are not
/// ours to delete.
pub async fn delete_media(
    State(state): State<AppState>,
    Path(section): Path<ContentSection>,
    axum::Json(request): axum::Json<DeleteImageRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !media::is_bare_object_name(&request.image_path) {
        return Err(ApiError::BadRequest(format!(
            "`{}` is not a stored object name",
            request.image_path
        )));
    }
    state
        .store
        .remove(section.bucket(), &[request.image_path])
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/content/{section}",
        Router::new()
            .route("/upload", post(upload_media))
            .route("/delete-image", post(delete_media)),
    )
}
