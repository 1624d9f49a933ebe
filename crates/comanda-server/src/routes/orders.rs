//! Order lifecycle handlers. Placement and code tracking are public;
//! every other order route is staff-only behind the admin gate.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use comanda_db::orders::OrderPatch;
use comanda_db::{NewOrder, NewOrderLine, OrderStatus};

use crate::api_types::{
    ListOrdersQuery, PlaceOrderRequest, PlaceOrderResponse, UpdateLineRequest, UpdateOrderRequest,
};
use crate::error::ApiError;
use crate::notify::OrderEvent;
use crate::routes::require_admin;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /api/pedidos (public)
// ---------------------------------------------------------------------------

pub(crate) async fn create(
    State(st): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.customer.trim().is_empty() {
        return Err(ApiError::bad_request("cliente is required"));
    }
    if req.lines.is_empty() {
        return Err(ApiError::bad_request("productos must not be empty"));
    }
    for line in &req.lines {
        if line.quantity <= 0 {
            return Err(ApiError::bad_request("cantidad must be > 0"));
        }
        if line.unit_price <= 0.0 {
            return Err(ApiError::bad_request("precio must be > 0"));
        }
    }

    let order = NewOrder {
        customer: req.customer.trim().to_string(),
        table_label: req.table_label,
        lines: req
            .lines
            .iter()
            .map(|l| NewOrderLine {
                product_id: l.id,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
    };

    let placement = comanda_db::place_order(&st.db, &order).await?;
    tracing::info!(
        order_id = placement.order_id,
        code = %placement.tracking_code,
        reused = placement.reused,
        "order placed"
    );

    // Best-effort fan-out: a reload failure must not undo the placement.
    match comanda_db::orders::fetch_order(&st.db, placement.order_id).await {
        Ok(Some(detail)) => {
            let payload = serde_json::to_value(&detail).unwrap_or_default();
            if placement.reused {
                st.notifier
                    .publish_room(
                        &placement.tracking_code,
                        OrderEvent::OrderUpdated { order: payload },
                    )
                    .await;
            } else {
                st.notifier
                    .publish_global(OrderEvent::OrderCreated { order: payload });
            }
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "post-placement reload failed"),
    }

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            success: true,
            order_id: placement.order_id,
            tracking_code: placement.tracking_code,
            total: placement.total,
            reused: placement.reused,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/pedidos (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn list(
    State(st): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let orders = comanda_db::orders::list_orders(&st.db).await?;

    if query.include.as_deref() != Some("detalles") {
        return Ok(Json(json!({ "success": true, "data": orders })));
    }

    let mut by_order: std::collections::HashMap<i64, Vec<_>> = std::collections::HashMap::new();
    for (order_id, line) in comanda_db::orders::all_order_lines(&st.db).await? {
        by_order.entry(order_id).or_default().push(line);
    }

    let data: Vec<serde_json::Value> = orders
        .into_iter()
        .map(|order| {
            let lines = by_order.remove(&order.id).unwrap_or_default();
            let mut value = serde_json::to_value(&order).unwrap_or_default();
            value["lineas"] = serde_json::to_value(lines).unwrap_or_default();
            value
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

// ---------------------------------------------------------------------------
// GET /api/pedidos/agrupados, /api/pedidos/grupo/:codigo (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn groups(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let groups = comanda_db::orders::order_groups(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": groups })))
}

pub(crate) async fn group_detail(
    State(st): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let code = normalize_code(&code);
    let orders = comanda_db::orders::orders_in_group(&st.db, &code).await?;
    if orders.is_empty() {
        return Err(ApiError::not_found(format!("no orders for code {code}")));
    }
    Ok(Json(json!({ "success": true, "data": orders })))
}

// ---------------------------------------------------------------------------
// GET /api/pedidos/codigo/:codigo (public tracking)
// ---------------------------------------------------------------------------

pub(crate) async fn track(
    State(st): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = normalize_code(&code);
    let detail = comanda_db::orders::fetch_order_by_code(&st.db, &code)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no order for code {code}")))?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

// ---------------------------------------------------------------------------
// GET /api/pedidos/:id, /api/pedidos/:id/lineas (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn fetch(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let detail = comanda_db::orders::fetch_order(&st.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order {id} not found")))?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

pub(crate) async fn lines(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let lines = comanda_db::orders::order_lines(&st.db, id).await?;
    Ok(Json(json!({ "success": true, "data": lines })))
}

// ---------------------------------------------------------------------------
// PUT /api/pedidos/:id (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn update(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let status = req
        .status
        .as_deref()
        .map(OrderStatus::parse)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    if let Some(total) = req.total {
        if total < 0.0 {
            return Err(ApiError::bad_request("total must be >= 0"));
        }
    }

    let patch = OrderPatch {
        status,
        customer: req.customer,
        table_label: req.table_label.map(Some),
        total: req.total,
    };
    if patch.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let matched = comanda_db::orders::update_order(&st.db, id, &patch).await?;
    if matched == 0 {
        return Err(ApiError::not_found(format!("order {id} not found")));
    }

    let detail = comanda_db::orders::fetch_order(&st.db, id).await?;
    if let Some(detail) = &detail {
        if status.is_some() {
            st.notifier
                .publish_room(
                    &detail.summary.tracking_code,
                    OrderEvent::OrderUpdated {
                        order: serde_json::to_value(detail).unwrap_or_default(),
                    },
                )
                .await;
        }
    }

    tracing::info!(id, status = ?status.map(|s| s.as_str()), "order updated");
    Ok(Json(json!({ "success": true, "data": detail })))
}

// ---------------------------------------------------------------------------
// PUT /api/pedidos/lineas/:id (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn update_line(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateLineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let status =
        OrderStatus::parse(&req.status).map_err(|err| ApiError::bad_request(err.to_string()))?;

    let order_id = comanda_db::orders::update_line_status(&st.db, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order line {id} not found")))?;

    // Subscribers get the full snapshot, not a line delta.
    let lines = comanda_db::orders::order_lines(&st.db, order_id).await?;
    let detail = comanda_db::orders::fetch_order(&st.db, order_id).await?;
    if let Some(detail) = &detail {
        st.notifier
            .publish_room(
                &detail.summary.tracking_code,
                OrderEvent::OrderLineUpdated {
                    order: serde_json::to_value(detail).unwrap_or_default(),
                    lines: serde_json::to_value(&lines).unwrap_or_default(),
                },
            )
            .await;
    }

    tracing::info!(line_id = id, order_id, status = status.as_str(), "line updated");
    Ok(Json(json!({ "success": true, "data": lines })))
}

// ---------------------------------------------------------------------------
// DELETE /api/pedidos/:id (admin)
// ---------------------------------------------------------------------------

pub(crate) async fn remove(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let code = comanda_db::orders::delete_order(&st.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("order {id} not found")))?;

    tracing::info!(id, code = %code, "order deleted");
    Ok(Json(json!({ "success": true })))
}

/// Tracking codes arrive from URLs and QR scans; normalize before lookup.
fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
