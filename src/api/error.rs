//! HTTP error taxonomy shared by every handler.
//!
//! Storage and handler code return `ApiError`; the `IntoResponse` impl maps
//! each variant to its status code and a JSON `{message}` body. Database
//! failures are logged server-side and surfaced as a generic 500 so raw
//! driver errors never reach the client; the recognized SQLSTATEs (unique
//! and foreign-key violations) are translated into descriptive conflicts by
//! the storage modules before they get here.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

/// One field-level validation failure, `express-validator` style.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    #[must_use]
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 with per-field messages.
    Validation(Vec<FieldError>),
    /// 400 with a single message (missing villa, capacity reached, ...).
    BadRequest(&'static str),
    /// 401, message distinguishes missing vs expired vs invalid tokens.
    Unauthorized(&'static str),
    /// 403 role or ownership mismatch.
    Forbidden(&'static str),
    NotFound(&'static str),
    /// 409 uniqueness violation, FK-referenced row, already-inactive user.
    Conflict(&'static str),
    /// 429 from the brute-force guard.
    RateLimited(&'static str),
    Database(sqlx::Error),
    /// 500 for invariant breakage that is not a driver error.
    Internal(&'static str),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Datos inválidos", "errors": errors })),
            )
                .into_response(),
            Self::BadRequest(message) => message_response(StatusCode::BAD_REQUEST, message),
            Self::Unauthorized(message) => message_response(StatusCode::UNAUTHORIZED, message),
            Self::Forbidden(message) => message_response(StatusCode::FORBIDDEN, message),
            Self::NotFound(message) => message_response(StatusCode::NOT_FOUND, message),
            Self::Conflict(message) => message_response(StatusCode::CONFLICT, message),
            Self::RateLimited(message) => message_response(StatusCode::TOO_MANY_REQUESTS, message),
            Self::Database(err) => {
                error!("Database error: {err}");
                message_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor",
                )
            }
            Self::Internal(detail) => {
                error!("Internal error: {detail}");
                message_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor",
                )
            }
        }
    }
}

fn message_response(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Returns `true` when `err` is a database unique-violation (SQLSTATE `23505`).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Returns `true` when `err` is a foreign-key violation (SQLSTATE `23503`).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ApiError::BadRequest("x"), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x"), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x"), StatusCode::CONFLICT),
            (ApiError::RateLimited("x"), StatusCode::TOO_MANY_REQUESTS),
            (
                ApiError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::Validation(vec![FieldError::new("nombre", "El nombre es obligatorio")]);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn sqlstate_helpers_ignore_non_database_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }
}
