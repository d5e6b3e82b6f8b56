//! Mapping of repository and handler failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable code clients can branch on, e.g. `SCHEDULING_CONFLICT`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Extra context, e.g. the blocking session of a conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Failure paths of the HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// The addressed resource is absent.
    NotFound(String),
    /// The request body or parameters failed validation.
    BadRequest(String),
    /// Unexpected server-side failure.
    Internal(String),
    /// A store operation failed; mapped per variant.
    Repository(RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Repository(e) => return repository_response(e),
        };

        (status, Json(error)).into_response()
    }
}

/// Map repository errors onto the HTTP taxonomy.
///
/// Session-overlap conflicts get their own code so clients can tell "this
/// exact slot is taken" apart from other uniqueness violations.
fn repository_response(err: RepositoryError) -> Response {
    let (status, error) = match &err {
        RepositoryError::NotFound { message, context } => {
            let code = if context.entity.as_deref() == Some("lesson") {
                "LESSON_NOT_FOUND"
            } else {
                "NOT_FOUND"
            };
            (StatusCode::NOT_FOUND, ApiError::new(code, message.clone()))
        }
        RepositoryError::Conflict { message, context } => {
            let code = if context.entity.as_deref() == Some("session") {
                "SCHEDULING_CONFLICT"
            } else {
                "CONFLICT"
            };
            let api = match &context.details {
                Some(details) => ApiError::new(code, message.clone()).with_details(details.clone()),
                None => ApiError::new(code, message.clone()),
            };
            (StatusCode::CONFLICT, api)
        }
        RepositoryError::ValidationError { message, .. } => (
            StatusCode::BAD_REQUEST,
            ApiError::new("VALIDATION_ERROR", message.clone()),
        ),
        RepositoryError::ConnectionError { .. } | RepositoryError::TimeoutError { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError::new("UPSTREAM_UNAVAILABLE", err.to_string()),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("REPOSITORY_ERROR", err.to_string()),
        ),
    };

    (status, Json(error)).into_response()
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_booking_conflict_gets_dedicated_code() {
        let err = RepositoryError::conflict_with_context(
            "Teacher 1 already has a session",
            ErrorContext::new("create_session").with_entity("session"),
        );
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = RepositoryError::validation("end before start");
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
