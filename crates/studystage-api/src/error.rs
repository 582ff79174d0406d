//! API error types and JSON error response formatting.
//!
//! Every handler failure becomes `{"error": <code>, "message": <text>}` with
//! a status code chosen by what went wrong.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use studystage_chat::ChatError;
use studystage_core::error::StudyError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "bad_request", "bad_gateway").
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing or invalid input.
    BadRequest(String),
    /// 409 - the request needs indexed documents and there are none.
    Conflict(String),
    /// 500 - unexpected server error.
    Internal(String),
    /// 502 - the upstream model or parser API failed.
    BadGateway(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                ("internal_error", msg)
            }
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "Upstream service failed");
                ("bad_gateway", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StudyError> for ApiError {
    fn from(err: StudyError) -> Self {
        match &err {
            StudyError::EmptyInput
            | StudyError::InvalidArgument(_)
            | StudyError::DimensionMismatch { .. } => ApiError::BadRequest(err.to_string()),
            StudyError::EmbeddingUnavailable { .. } | StudyError::Service(_) => {
                ApiError::BadGateway(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) | ChatError::InvalidRequest(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::NoContext => ApiError::Conflict(err.to_string()),
            ChatError::Llm(_) | ChatError::Digitize(_) => ApiError::BadGateway(err.to_string()),
            ChatError::Retrieval(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_error_status_mapping() {
        let cases = vec![
            (StudyError::EmptyInput, StatusCode::BAD_REQUEST),
            (
                StudyError::InvalidArgument("top_k".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StudyError::DimensionMismatch {
                    expected: 4,
                    actual: 3,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                StudyError::EmbeddingUnavailable { chunks: 1 },
                StatusCode::BAD_GATEWAY,
            ),
            (
                StudyError::Service("timeout".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                StudyError::Config("no key".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StudyError::Internal("poisoned".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_chat_error_status_mapping() {
        assert_eq!(
            ApiError::from(ChatError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::MessageTooLong(2000)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::NoContext).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ChatError::Llm("503".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ChatError::Digitize("bad pdf".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(ChatError::Retrieval(StudyError::EmptyInput)).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_body_shape() {
        let resp = ApiError::Conflict("no documents".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
