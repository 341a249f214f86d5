use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Mounted behind `auth_middleware`.
pub fn router() -> Router {
    Router::new().route("/me", get(my_transactions))
}

pub async fn my_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ApiError> {
    let transactions = services
        .ledger
        .history_for_user(principal.user_id())
        .await
        .map_err(|e| ApiError::service(e, "Failed to fetch transactions"))?;

    Ok(Json(json!({
        "success": true,
        "count": transactions.len(),
        "transactions": transactions,
    }))
    .into_response())
}
