use axum::Router;

pub mod auth;
pub mod sweets;
pub mod system;
pub mod transactions;

/// Routes whose handlers authenticate per endpoint (via extractors).
pub fn router() -> Router {
    Router::new()
        .nest("/api/sweets", sweets::router())
        .nest("/api/auth", auth::router())
}
