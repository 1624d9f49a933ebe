//! Product catalog handlers. Reads are public (the menu), mutations are
//! admin-gated.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use comanda_db::products::{NewProduct, ProductPatch};

use crate::api_types::{NewProductRequest, UpdateProductRequest};
use crate::error::ApiError;
use crate::notify::OrderEvent;
use crate::routes::require_admin;
use crate::state::AppState;

pub(crate) async fn list(
    State(st): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = comanda_db::products::list_products(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": products })))
}

pub(crate) async fn fetch(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = comanda_db::products::fetch_product(&st.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("product {id} not found")))?;
    Ok(Json(json!({ "success": true, "data": product })))
}

pub(crate) async fn create(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("nombre is required"));
    }
    if req.price <= 0.0 {
        return Err(ApiError::bad_request("precio must be > 0"));
    }

    let new_product = NewProduct {
        name: req.name,
        price: req.price,
        category: req.category,
        image: req.image,
        description: req.description,
    };
    let id = comanda_db::products::insert_product(&st.db, &new_product).await?;

    if let Some(product) = comanda_db::products::fetch_product(&st.db, id).await? {
        st.notifier.publish_global(OrderEvent::ProductCreated {
            product: serde_json::to_value(&product).unwrap_or_default(),
        });
    }

    tracing::info!(id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": id })),
    ))
}

pub(crate) async fn update(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("nombre must not be empty"));
        }
    }
    if let Some(price) = req.price {
        if price <= 0.0 {
            return Err(ApiError::bad_request("precio must be > 0"));
        }
    }

    let patch = ProductPatch {
        name: req.name,
        price: req.price,
        category: req.category.map(Some),
        image: req.image.map(Some),
        description: req.description.map(Some),
    };
    if patch.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let matched = comanda_db::products::update_product(&st.db, id, &patch).await?;
    if matched == 0 {
        return Err(ApiError::not_found(format!("product {id} not found")));
    }

    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn remove(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let matched = comanda_db::products::soft_delete_product(&st.db, id).await?;
    if matched == 0 {
        return Err(ApiError::not_found(format!("product {id} not found")));
    }

    tracing::info!(id, "product deactivated");
    Ok(Json(json!({ "success": true })))
}
