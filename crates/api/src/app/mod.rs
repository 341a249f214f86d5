//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON coercions
//! - `errors.rs`: the `{success, message}` error envelope
//! - `cors.rs`: cross-origin policy for browser clients

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use sweetshop_auth::JwtValidator;

use crate::middleware;

pub mod cors;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(
    services: Arc<services::AppServices>,
    jwt: Arc<dyn JwtValidator>,
    cors: CorsLayer,
) -> Router {
    let auth_state = middleware::AuthState { jwt };

    // Every route here requires a valid token.
    let protected = Router::new()
        .nest("/api/transactions", routes::transactions::router())
        .layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .merge(protected)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(Extension(services))
                .layer(Extension(auth_state)),
        )
}
