use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use sweetshop_core::DomainError;
use sweetshop_infra::ServiceError;

use crate::app::dto::{self, CreateSweetRequest, QuantityRequest, SearchParams, UpdateSweetRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{AdminContext, PrincipalContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sweets).post(create_sweet))
        .route("/search", get(search_sweets))
        .route("/:id", get(get_sweet).put(update_sweet).delete(delete_sweet))
        .route("/:id/purchase", post(purchase_sweet))
        .route("/:id/restock", post(restock_sweet))
        .route("/:id/transactions", get(sweet_transactions))
}

pub async fn list_sweets(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let sweets = services
        .catalog
        .list()
        .await
        .map_err(|e| ApiError::service(e, "Failed to fetch sweets"))?;

    Ok(Json(json!({ "success": true, "count": sweets.len(), "sweets": sweets })).into_response())
}

pub async fn search_sweets(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let sweets = services
        .catalog
        .search(params.into_query()?)
        .await
        .map_err(|e| ApiError::service(e, "Failed to search sweets"))?;

    Ok(Json(json!({ "success": true, "count": sweets.len(), "sweets": sweets })).into_response())
}

pub async fn get_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let sweet = services
        .catalog
        .get(dto::sweet_id(&id)?)
        .await
        .map_err(|e| ApiError::service(e, "Failed to fetch sweet"))?;

    Ok(Json(json!({ "success": true, "sweet": sweet })).into_response())
}

pub async fn create_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    body: Result<Json<CreateSweetRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let sweet = services
        .catalog
        .create(body.into_new_sweet()?)
        .await
        .map_err(|e| ApiError::service(e, "Failed to create sweet"))?;

    tracing::info!(sweet_id = %sweet.id, user_id = %principal.user_id(), "sweet added to catalog");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Sweet created successfully",
            "sweet": sweet,
        })),
    )
        .into_response())
}

pub async fn update_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    _principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<UpdateSweetRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    // Body errors win over an unknown id.
    let Json(body) = body?;
    let changes = body.into_patch()?.validate()?;
    let id = dto::sweet_id(&id)?;
    let sweet = services
        .catalog
        .update(id, changes)
        .await
        .map_err(|e| ApiError::service(e, "Failed to update sweet"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Sweet updated successfully",
        "sweet": sweet,
    }))
    .into_response())
}

pub async fn delete_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    AdminContext(admin): AdminContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = dto::sweet_id(&id)?;
    services
        .catalog
        .delete(id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to delete sweet"))?;

    tracing::info!(sweet_id = %id, admin = admin.username(), "sweet removed from catalog");

    Ok(Json(json!({ "success": true, "message": "Sweet deleted successfully" })).into_response())
}

pub async fn purchase_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    body: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let quantity = body.quantity()?;
    // Unknown ids and short stock share one answer.
    let Ok(sweet_id) = dto::sweet_id(&id) else {
        return Err(ApiError::not_found("Sweet not found or insufficient quantity"));
    };

    let receipt = services
        .ledger
        .purchase(principal.user_id(), sweet_id, quantity)
        .await
        .map_err(|e| match e {
            ServiceError::Domain(DomainError::NotFound(_)) => {
                ApiError::not_found("Sweet not found or insufficient quantity")
            }
            other => ApiError::service(other, "Failed to purchase sweet"),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Sweet purchased successfully",
        "sweet": receipt.sweet,
        "transaction": receipt.transaction,
    }))
    .into_response())
}

pub async fn restock_sweet(
    Extension(services): Extension<Arc<AppServices>>,
    AdminContext(admin): AdminContext,
    Path(id): Path<String>,
    body: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let quantity = body.quantity()?;
    let sweet_id = dto::sweet_id(&id)?;

    let receipt = services
        .ledger
        .restock(admin.user_id(), sweet_id, quantity)
        .await
        .map_err(|e| ApiError::service(e, "Failed to restock sweet"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Sweet restocked successfully",
        "sweet": receipt.sweet,
        "transaction": receipt.transaction,
    }))
    .into_response())
}

pub async fn sweet_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    _admin: AdminContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let sweet_id = dto::sweet_id(&id)?;
    let transactions = services
        .ledger
        .history_for_sweet(sweet_id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to fetch transactions"))?;

    Ok(Json(json!({
        "success": true,
        "count": transactions.len(),
        "transactions": transactions,
    }))
    .into_response())
}
