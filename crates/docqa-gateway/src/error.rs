use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docqa_core::QaError;
use docqa_memory::document::DocumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
}

/// Request failure rendered as `{"status": <code>, "detail": <message>}`.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Extractor rejection that carries its own status, such as an oversized body.
    #[error("{1}")]
    Status(StatusCode, String),
    #[error("question timed out after {0}s")]
    Timeout(u64),
    #[error("upload failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Qa(#[from] QaError),
}

#[derive(serde::Serialize)]
struct ErrorBody {
    status: u16,
    detail: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Status(status, _) => *status,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Qa(QaError::DocumentNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Qa(QaError::Document(DocumentError::FileTooLarge(_))) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Qa(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Qa(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Io(_) | Self::Qa(QaError::Storage(_)) => "Internal server error".into(),
            Self::Qa(QaError::DocumentNotFound(_)) => "Document not found".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::warn!("request rejected: {self}");
        }
        let body = ErrorBody {
            status: status.as_u16(),
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Qa(QaError::EmptyDocument).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Qa(QaError::InvalidConfig("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Qa(QaError::DocumentNotFound(1)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Qa(QaError::NoAnswerFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Qa(QaError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Timeout(5).status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn storage_details_are_hidden() {
        let err = ApiError::Io(std::io::Error::other("disk on fire"));
        assert_eq!(err.detail(), "Internal server error");
    }

    #[test]
    fn not_found_detail() {
        assert_eq!(
            ApiError::Qa(QaError::DocumentNotFound(9)).detail(),
            "Document not found"
        );
    }
}
