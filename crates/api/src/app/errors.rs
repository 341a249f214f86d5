//! Error envelope: every failure is `{"success": false, "message": ...}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use sweetshop_core::DomainError;
use sweetshop_infra::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn missing_token() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Access denied. No token provided.")
    }

    pub fn invalid_token() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid token. Authentication failed.")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Map a service failure. Caller-caused errors keep their message;
    /// internal failures are logged and reported as `internal_message`.
    pub fn service(err: ServiceError, internal_message: &'static str) -> Self {
        match err {
            ServiceError::Domain(domain) => Self::from(domain),
            other => {
                tracing::error!(error = %other, "{internal_message}");
                Self::internal(internal_message)
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::Conflict(msg) => Self::bad_request(msg),
            DomainError::InvalidId(msg) => Self::bad_request(msg),
            DomainError::NotFound(what) => Self::not_found(format!("{what} not found")),
            DomainError::InsufficientStock { .. } => {
                Self::not_found("Sweet not found or insufficient quantity")
            }
            DomainError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            DomainError::Forbidden(msg) => Self::forbidden(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::bad_request("Invalid JSON request body")
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected query string");
        Self::bad_request("Invalid query parameters")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "success": false,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("taken"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("Sweet"), StatusCode::NOT_FOUND),
            (
                DomainError::InsufficientStock {
                    requested: 2,
                    available: 1,
                },
                StatusCode::NOT_FOUND,
            ),
            (DomainError::unauthorized("no"), StatusCode::UNAUTHORIZED),
            (DomainError::forbidden("no"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn not_found_message_names_the_record() {
        assert_eq!(ApiError::from(DomainError::not_found("Sweet")).message(), "Sweet not found");
    }

    #[test]
    fn internal_failures_hide_details() {
        let err = ApiError::service(
            ServiceError::Task("worker panicked at secret.rs".to_string()),
            "Failed to create sweet",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to create sweet");
    }
}
