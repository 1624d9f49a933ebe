//! Category handlers. Public list, admin mutations.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api_types::CategoryRequest;
use crate::error::ApiError;
use crate::routes::require_admin;
use crate::state::AppState;

pub(crate) async fn list(
    State(st): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = comanda_db::categories::list_categories(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": categories })))
}

pub(crate) async fn create(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("nombre is required"));
    }

    // Re-creating an existing name revives it and returns the same id.
    let id = comanda_db::categories::insert_category(&st.db, name).await?;
    tracing::info!(id, name, "category created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": id })),
    ))
}

pub(crate) async fn update(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("nombre is required"));
    }

    let matched = match comanda_db::categories::rename_category(&st.db, id, name).await {
        Ok(n) => n,
        Err(err) if comanda_db::categories::is_unique_violation(&err) => {
            return Err(ApiError::conflict(format!("category {name} already exists")));
        }
        Err(err) => return Err(err.into()),
    };
    if matched == 0 {
        return Err(ApiError::not_found(format!("category {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn remove(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let matched = comanda_db::categories::soft_delete_category(&st.db, id).await?;
    if matched == 0 {
        return Err(ApiError::not_found(format!("category {id} not found")));
    }
    Ok(Json(json!({ "success": true })))
}
