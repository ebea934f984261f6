use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth/token errors
/// - E2xxx: Session lifecycle errors (calls and streams)
/// - E3xxx: Camera errors
/// - E4xxx: Swipe/discovery errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    BadRequest,

    // Auth (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Session lifecycle (E2xxx)
    CallNotFound,
    ParticipantNotFound,
    StreamNotFound,
    ViewerNotFound,
    IllegalTransition,
    InvalidParticipantSet,
    PaymentRequired,
    GenerationExhausted,

    // Camera (E3xxx)
    CameraNotFound,
    CameraStreamMismatch,

    // Swipe (E4xxx)
    SwipeLimitReached,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::RateLimited => "E0006",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",

            // Auth
            Self::TokenExpired => "E1001",
            Self::TokenInvalid => "E1002",

            // Session lifecycle
            Self::CallNotFound => "E2001",
            Self::ParticipantNotFound => "E2002",
            Self::StreamNotFound => "E2003",
            Self::ViewerNotFound => "E2004",
            Self::IllegalTransition => "E2005",
            Self::InvalidParticipantSet => "E2006",
            Self::PaymentRequired => "E2007",
            Self::GenerationExhausted => "E2008",

            // Camera
            Self::CameraNotFound => "E3001",
            Self::CameraStreamMismatch => "E3002",

            // Swipe
            Self::SwipeLimitReached => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::InvalidParticipantSet => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound | Self::CallNotFound | Self::ParticipantNotFound
            | Self::StreamNotFound | Self::ViewerNotFound | Self::CameraNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden | Self::CameraStreamMismatch => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::SwipeLimitReached => StatusCode::TOO_MANY_REQUESTS,
            Self::IllegalTransition => StatusCode::CONFLICT,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::GenerationExhausted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// A state-machine rule violation. Carries the unchanged prior state in
    /// the error details so callers can see what the session still is.
    pub fn illegal_transition(action: &str, prior_state: &str) -> Self {
        Self::with_details(
            ErrorCode::IllegalTransition,
            format!("cannot {action} from state '{prior_state}'"),
            serde_json::json!({ "state": prior_state, "action": action }),
        )
    }

    /// The error code for `Known` errors; infrastructure variants map to
    /// their implied shared code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            Self::Database(_) => ErrorCode::InternalError,
            Self::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_ranges_are_stable() {
        assert_eq!(ErrorCode::IllegalTransition.code(), "E2005");
        assert_eq!(ErrorCode::PaymentRequired.code(), "E2007");
        assert_eq!(ErrorCode::GenerationExhausted.code(), "E2008");
        assert_eq!(ErrorCode::SwipeLimitReached.code(), "E4001");
    }

    #[test]
    fn illegal_transition_keeps_prior_state() {
        let err = AppError::illegal_transition("answer", "ended");
        assert_eq!(err.error_code(), ErrorCode::IllegalTransition);
        match err {
            AppError::Known { details: Some(d), .. } => {
                assert_eq!(d["state"], "ended");
                assert_eq!(d["action"], "answer");
            }
            other => panic!("unexpected error shape: {other:?}"),
        }
    }

    #[test]
    fn payment_required_maps_to_402() {
        assert_eq!(
            ErrorCode::PaymentRequired.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(ErrorCode::IllegalTransition.status_code(), StatusCode::CONFLICT);
    }
}
