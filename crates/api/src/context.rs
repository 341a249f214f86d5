//! Request identity, resolved from the bearer token.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;

use sweetshop_auth::JwtClaims;
use sweetshop_core::UserId;

use crate::app::errors::ApiError;
use crate::middleware::{AuthState, extract_bearer};

/// Authenticated caller for a request.
///
/// Usable as an extractor on any route: reuses the context inserted by
/// [`crate::middleware::auth_middleware`] when present, otherwise validates
/// the `Authorization` header itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
    is_admin: bool,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

impl From<JwtClaims> for PrincipalContext {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.user_id, claims.username, claims.is_admin)
    }
}

/// Resolve the caller from request parts.
pub fn authenticate(parts: &Parts) -> Result<PrincipalContext, ApiError> {
    if let Some(principal) = parts.extensions.get::<PrincipalContext>() {
        return Ok(principal.clone());
    }

    let state = parts.extensions.get::<AuthState>().ok_or_else(|| {
        tracing::error!("AuthState extension missing from router");
        ApiError::internal("Authentication is not configured")
    })?;

    let token = extract_bearer(&parts.headers).ok_or_else(ApiError::missing_token)?;
    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::invalid_token()
    })?;
    Ok(claims.into())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for PrincipalContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts)
    }
}

/// Authenticated caller holding the admin flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext(pub PrincipalContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts)?;
        if !principal.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(Self(principal))
    }
}
