//! Analytics handlers, all admin-gated. Thin wrappers over the report
//! queries plus the dashboard aggregate.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;

use comanda_db::analytics::{OrderSearch, SalesPeriod};
use comanda_db::OrderStatus;

use crate::api_types::{OrderSearchQuery, SalesQuery, TopQuery};
use crate::error::ApiError;
use crate::routes::require_admin;
use crate::state::AppState;

const DEFAULT_TOP_LIMIT: i64 = 10;

pub(crate) async fn sales(
    State(st): State<Arc<AppState>>,
    Query(query): Query<SalesQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let period = SalesPeriod::parse(query.period.as_deref().unwrap_or("dia"))
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let data = comanda_db::analytics::sales_by_period(&st.db, period).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn top_products(
    State(st): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    let data = comanda_db::analytics::top_products(&st.db, limit).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn top_customers(
    State(st): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    let data = comanda_db::analytics::top_customers(&st.db, limit).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn totals(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::revenue_totals(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn statuses(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::status_breakdown(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn by_hour(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::sales_by_hour(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn weekly(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::weekly_sales(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn trend(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::sales_trend(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn search(
    State(st): State<Arc<AppState>>,
    Query(query): Query<OrderSearchQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let status = query
        .status
        .as_deref()
        .map(OrderStatus::parse)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let search = OrderSearch {
        customer: query.customer,
        status,
        date_from: parse_date(query.date_from.as_deref())?,
        date_to: parse_date(query.date_to.as_deref())?,
        total_min: query.total_min,
        total_max: query.total_max,
        limit: query.limit,
    };

    let data = comanda_db::analytics::search_orders(&st.db, &search).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub(crate) async fn customers(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;
    let data = comanda_db::analytics::distinct_customers(&st.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// One round trip for the dashboard header: the sub-reports run
/// concurrently and the first failure aborts the lot.
pub(crate) async fn dashboard(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&st, &headers).await?;

    let (totals, statuses, top, week) = tokio::try_join!(
        comanda_db::analytics::revenue_totals(&st.db),
        comanda_db::analytics::status_breakdown(&st.db),
        comanda_db::analytics::top_products(&st.db, DEFAULT_TOP_LIMIT),
        comanda_db::analytics::weekly_sales(&st.db),
    )?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "resumen": totals,
            "estados": statuses,
            "top_productos": top,
            "semana": week,
        }
    })))
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("invalid date: {s}")))
    })
    .transpose()
}
