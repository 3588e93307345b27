use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use odrlab_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound("record not found".to_string()),
            StoreError::EmailTaken => {
                ApiError::Conflict("an account with this email already exists".to_string())
            }
            // Duplicate joins surface as 400 to match the collaboration contract.
            StoreError::AlreadyMember(label) => {
                ApiError::BadRequest(format!("already a {label} on this idea"))
            }
            StoreError::AlreadyReviewed => {
                ApiError::Conflict("record has already been reviewed".to_string())
            }
            StoreError::InvalidParent => {
                ApiError::BadRequest("parent comment belongs to a different idea".to_string())
            }
            StoreError::RoleMismatch => {
                ApiError::BadRequest("profile fields do not match the requested role".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "validation failed",
                    "field": field,
                    "message": message,
                }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            ApiError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({
                    "error": "authentication token has expired",
                    "reason": "expired",
                }),
            ),
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, serde_json::json!({ "error": msg }))
            }
            // Detail stays server-side; the body is deliberately generic.
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "internal server error" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_map_to_http_semantics() {
        let err: ApiError = StoreError::AlreadyReviewed.into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = StoreError::AlreadyMember("collaborator").into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = StoreError::NotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
