use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::app::dto::{LoginRequest, RegisterRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let session = services
        .accounts
        .register(body.into_registration())
        .await
        .map_err(|e| ApiError::service(e, "Registration failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": session.user,
            "token": session.token,
        })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let session = services
        .accounts
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| ApiError::service(e, "Login failed"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": session.user,
        "token": session.token,
    }))
    .into_response())
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
) -> Result<Response, ApiError> {
    let user = services
        .accounts
        .profile(principal.user_id())
        .await
        .map_err(|e| ApiError::service(e, "Failed to get user profile"))?;

    Ok(Json(json!({ "success": true, "user": user })).into_response())
}
