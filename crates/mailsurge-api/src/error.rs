/// API Error types
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convert engine errors to API errors: validation and configuration
/// problems are the caller's fault, everything else is ours
impl From<mailsurge_core::SurgeError> for ApiError {
    fn from(err: mailsurge_core::SurgeError) -> Self {
        match err {
            mailsurge_core::SurgeError::Validation(msg) => ApiError::BadRequest(msg),
            mailsurge_core::SurgeError::Config(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surge_error_mapping() {
        let err: ApiError = mailsurge_core::SurgeError::Validation("bad".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = mailsurge_core::SurgeError::Queue("oops".to_string()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
