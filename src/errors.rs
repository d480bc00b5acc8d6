use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("session not found")]
    SessionNotFound,
    #[error("{message}")]
    Internal { code: &'static str, message: String },
    #[error("{message}")]
    Upstream { message: String },
}

/// Plain error body returned for failures rejected before dispatch.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn missing_session_id() -> Self {
        Self::bad_request("missing_session_id", "Missing Mcp-Session-Id header")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::SessionNotFound => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                "Session not found".to_string(),
            ),
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "internal server error".to_string(),
                )
            }
            Self::Upstream { message } => {
                tracing::warn!(error = %message, "upstream call failed");
                (StatusCode::BAD_GATEWAY, "upstream_error", message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn session_not_found_maps_to_404() {
        let response = AppError::SessionNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_request_display_carries_message() {
        let error = AppError::bad_request("invalid_json", "Bad request: trailing comma");
        assert_eq!(error.to_string(), "bad request: Bad request: trailing comma");
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
