use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use services::services::{
    content::ContentError,
    editor::EditorError,
    storage::{StorageError, UploadRejection},
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // validation failures carry field-level detail for the form
            Self::Content(ContentError::Validation(errors))
            | Self::Editor(EditorError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiResponse::<Value> {
                    success: false,
                    data: serde_json::to_value(errors).ok(),
                    message: Some("validation failed".to_string()),
                },
            ),
            Self::Editor(EditorError::SaveInProgress) => (
                StatusCode::CONFLICT,
                ApiResponse::error("a save is already in flight"),
            ),
            Self::Rejected(rejection) | Self::Editor(EditorError::Rejected(rejection)) => {
                (StatusCode::BAD_REQUEST, ApiResponse::error(rejection.to_string()))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, ApiResponse::error(message)),
            Self::Multipart(e) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::error(format!("invalid multipart request: {e}")),
            ),
            // remote failures are reported generically; the client retries
            // by re-submitting
            e => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error("something went wrong, please try again"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
