use std::sync::Arc;

use anyhow::Context;
use sweetshop_auth::Hs256Jwt;
use sweetshop_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sweetshop_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting sweet shop api");

    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.token_ttl));
    let services = sweetshop_api::app::services::build_services(&config, jwt.clone()).await?;
    let cors = sweetshop_api::app::cors::cors_layer(&config.cors_origins)
        .context("invalid CORS_ALLOWED_ORIGINS")?;
    let app = sweetshop_api::app::build_app(Arc::new(services), jwt, cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
