use agriqa_core::AppError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Error returned by a handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    InvalidJson { status: StatusCode, message: String },

    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson { status, .. } => *status,
            ApiError::App(AppError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::App(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
            StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        // Internal details stay in the log
        let message = match &self {
            ApiError::App(_) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: self.error_code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let invalid = ApiError::from(AppError::InvalidInput("empty".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.error_code(), "BAD_REQUEST");

        let store = ApiError::from(AppError::Store("disk full".into()));
        assert_eq!(store.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(store.error_code(), "SERVICE_UNAVAILABLE");

        let other = ApiError::from(AppError::Prompt("bad template".into()));
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.error_code(), "INTERNAL_ERROR");
    }
}
