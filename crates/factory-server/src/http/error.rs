//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use factory_core::api::ErrorResponse;
use factory_core::CoreError;

use crate::devin::DevinError;
use crate::service::ServiceError;

/// Errors returned by the REST handlers as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::PrdNotFound(_)
            | CoreError::AgentNotFound(_)
            | CoreError::DevinTaskNotFound(_) => ApiError::NotFound(message),
            CoreError::InvalidStateTransition { .. } | CoreError::TaskBusy(_) => {
                ApiError::Conflict(message)
            }
            CoreError::UnknownVariant { .. } | CoreError::InvalidInput(_) => {
                ApiError::BadRequest(message)
            }
            CoreError::PayloadTooLarge(_) => ApiError::PayloadTooLarge(message),
            CoreError::Serialization(_) => ApiError::Internal(message),
        }
    }
}

impl From<DevinError> for ApiError {
    fn from(err: DevinError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(e) => e.into(),
            ServiceError::Devin(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::PrdNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                CoreError::InvalidStateTransition {
                    from: "queue".into(),
                    to: "completed".into(),
                },
                StatusCode::CONFLICT,
            ),
            (CoreError::TaskBusy("t".into()), StatusCode::CONFLICT),
            (CoreError::invalid("bad"), StatusCode::BAD_REQUEST),
            (
                CoreError::UnknownVariant {
                    kind: "PRD status",
                    value: "nope".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::PayloadTooLarge("big".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_devin_error_is_bad_gateway() {
        let err = ApiError::from(DevinError::MissingField("session_id"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display_is_bare_message() {
        let err = ApiError::from(CoreError::PrdNotFound("abc".into()));
        assert_eq!(err.to_string(), CoreError::PrdNotFound("abc".into()).to_string());
        assert_eq!(ApiError::Conflict("busy".into()).to_string(), "busy");
    }
}
