use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::app::errors::ApiError;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "status": "ok" })),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
