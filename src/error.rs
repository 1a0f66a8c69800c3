use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::services::attendance_service::AttendanceError;
use crate::services::check_in_service::CheckInError;
use crate::services::event_service::EventError;
use crate::services::token_service::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!(error = %e, "database error");
                "internal error".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({ "error": self.code(), "message": message })),
        )
            .into_response()
    }
}

// Extractor rejections keep the JSON error body and always answer 400.
impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Database(e) => AppError::Database(e),
            TokenError::Signing(e) => AppError::Internal(e),
            TokenError::NotFound => AppError::NotFound(e.to_string()),
            TokenError::Forbidden => AppError::Forbidden(e.to_string()),
            TokenError::EventCancelled => AppError::Conflict(e.to_string()),
            TokenError::Malformed => AppError::BadRequest(e.to_string()),
            TokenError::InvalidSignature
            | TokenError::Expired
            | TokenError::NotYetValid
            | TokenError::WrongAudience
            | TokenError::Unknown
            | TokenError::Revoked
            | TokenError::EventMismatch => AppError::Unauthorized(e.to_string()),
        }
    }
}

impl From<CheckInError> for AppError {
    fn from(e: CheckInError) -> Self {
        match e {
            CheckInError::Token(e) => e.into(),
            CheckInError::Database(e) => AppError::Database(e),
            CheckInError::EventNotFound | CheckInError::ParticipantNotFound => {
                AppError::NotFound(e.to_string())
            }
            CheckInError::NotRegistered | CheckInError::Forbidden => {
                AppError::Forbidden(e.to_string())
            }
            CheckInError::EventCancelled | CheckInError::OutsideWindow { .. } => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

impl From<EventError> for AppError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::Database(e) => AppError::Database(e),
            EventError::Validation(_) => AppError::BadRequest(e.to_string()),
            EventError::NotFound => AppError::NotFound(e.to_string()),
            EventError::Forbidden => AppError::Forbidden(e.to_string()),
            EventError::AlreadyRegistered | EventError::Cancelled => {
                AppError::Conflict(e.to_string())
            }
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::Database(e) => AppError::Database(e),
            AttendanceError::InvalidFilter(_) => AppError::BadRequest(e.to_string()),
            AttendanceError::EventNotFound => AppError::NotFound(e.to_string()),
            AttendanceError::Forbidden => AppError::Forbidden(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TokenError::Expired, StatusCode::UNAUTHORIZED)]
    #[case(TokenError::Revoked, StatusCode::UNAUTHORIZED)]
    #[case(TokenError::Malformed, StatusCode::BAD_REQUEST)]
    #[case(TokenError::Forbidden, StatusCode::FORBIDDEN)]
    #[case(TokenError::NotFound, StatusCode::NOT_FOUND)]
    fn token_errors_map_to_status(#[case] err: TokenError, #[case] expected: StatusCode) {
        assert_eq!(AppError::from(err).status(), expected);
    }

    #[rstest]
    #[case(CheckInError::NotRegistered, StatusCode::FORBIDDEN)]
    #[case(CheckInError::EventCancelled, StatusCode::CONFLICT)]
    #[case(CheckInError::ParticipantNotFound, StatusCode::NOT_FOUND)]
    #[case(CheckInError::Token(TokenError::InvalidSignature), StatusCode::UNAUTHORIZED)]
    fn check_in_errors_map_to_status(#[case] err: CheckInError, #[case] expected: StatusCode) {
        assert_eq!(AppError::from(err).status(), expected);
    }

    #[test]
    fn database_errors_do_not_leak_details() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }
}
