use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile errors
/// - E3xxx: Matching errors
/// - E4xxx: Messaging errors
/// - E5xxx: Block errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    RefreshTokenRevoked,
    PasswordTooWeak,

    // Profile (E2xxx)
    ProfileNotFound,
    ProfileIncomplete,
    InvalidDisplayName,
    PhotoUploadFailed,
    PhotoLimitReached,
    PhotoNotFound,

    // Matching (E3xxx)
    MatchNotFound,
    NotMatchParticipant,
    CannotDecideSelf,

    // Messaging (E4xxx)
    MessageBlocked,
    MatchClosed,

    // Blocks (E5xxx)
    CannotBlockSelf,
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
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",
            Self::PayloadTooLarge => "E0008",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::RefreshTokenRevoked => "E1005",
            Self::PasswordTooWeak => "E1006",

            // Profile
            Self::ProfileNotFound => "E2001",
            Self::ProfileIncomplete => "E2002",
            Self::InvalidDisplayName => "E2003",
            Self::PhotoUploadFailed => "E2004",
            Self::PhotoLimitReached => "E2005",
            Self::PhotoNotFound => "E2006",

            // Matching
            Self::MatchNotFound => "E3001",
            Self::NotMatchParticipant => "E3002",
            Self::CannotDecideSelf => "E3003",

            // Messaging
            Self::MessageBlocked => "E4001",
            Self::MatchClosed => "E4002",

            // Blocks
            Self::CannotBlockSelf => "E5001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::InvalidDisplayName | Self::ProfileIncomplete
            | Self::PhotoUploadFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound | Self::ProfileNotFound | Self::MatchNotFound
            | Self::PhotoNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::RefreshTokenRevoked => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchParticipant | Self::CannotDecideSelf
            | Self::MessageBlocked | Self::CannotBlockSelf => StatusCode::FORBIDDEN,
            Self::MatchClosed => StatusCode::GONE,
            Self::EmailAlreadyExists | Self::PhotoLimitReached => StatusCode::CONFLICT,
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

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
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
    fn duplicate_conflicts_map_to_409() {
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::PhotoLimitReached.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn blocked_send_is_forbidden_not_missing() {
        assert_eq!(ErrorCode::MessageBlocked.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotMatchParticipant.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::MatchClosed.status_code(), StatusCode::GONE);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError, ErrorCode::ValidationError, ErrorCode::NotFound,
            ErrorCode::Unauthorized, ErrorCode::Forbidden, ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest, ErrorCode::PayloadTooLarge,
            ErrorCode::InvalidCredentials, ErrorCode::EmailAlreadyExists,
            ErrorCode::TokenExpired, ErrorCode::TokenInvalid,
            ErrorCode::RefreshTokenRevoked, ErrorCode::PasswordTooWeak,
            ErrorCode::ProfileNotFound, ErrorCode::ProfileIncomplete,
            ErrorCode::InvalidDisplayName, ErrorCode::PhotoUploadFailed,
            ErrorCode::PhotoLimitReached, ErrorCode::PhotoNotFound,
            ErrorCode::MatchNotFound, ErrorCode::NotMatchParticipant,
            ErrorCode::CannotDecideSelf, ErrorCode::MessageBlocked,
            ErrorCode::MatchClosed, ErrorCode::CannotBlockSelf,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
