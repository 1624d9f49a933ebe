//! Axum router and HTTP handlers.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. Handlers are `pub(crate)` so the scenario
//! tests in `tests/` can compose the router directly.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api_types::HealthResponse;
use crate::error::ApiError;
use crate::session::{token_from_headers, Session};
use crate::state::AppState;

mod analytics;
mod auth;
mod categories;
mod orders;
mod products;
mod ws;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // products
        .route("/api/productos", get(products::list).post(products::create))
        .route(
            "/api/productos/:id",
            get(products::fetch)
                .put(products::update)
                .delete(products::remove),
        )
        // orders
        .route("/api/pedidos", get(orders::list).post(orders::create))
        .route("/api/pedidos/agrupados", get(orders::groups))
        .route("/api/pedidos/grupo/:codigo", get(orders::group_detail))
        .route("/api/pedidos/codigo/:codigo", get(orders::track))
        .route("/api/pedidos/lineas/:id", put(orders::update_line))
        .route(
            "/api/pedidos/:id",
            get(orders::fetch)
                .put(orders::update)
                .delete(orders::remove),
        )
        .route("/api/pedidos/:id/lineas", get(orders::lines))
        // categories
        .route(
            "/api/categorias",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categorias/:id",
            put(categories::update).delete(categories::remove),
        )
        // auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::whoami))
        // analytics
        .route("/api/analytics/ventas", get(analytics::sales))
        .route("/api/analytics/top-productos", get(analytics::top_products))
        .route("/api/analytics/top-clientes", get(analytics::top_customers))
        .route("/api/analytics/resumen", get(analytics::totals))
        .route("/api/analytics/estados", get(analytics::statuses))
        .route("/api/analytics/por-hora", get(analytics::by_hour))
        .route("/api/analytics/semana", get(analytics::weekly))
        .route("/api/analytics/tendencia", get(analytics::trend))
        .route("/api/analytics/buscar", get(analytics::search))
        .route("/api/analytics/clientes", get(analytics::customers))
        .route("/api/analytics/dashboard", get(analytics::dashboard))
        // realtime
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// Session gates
// ---------------------------------------------------------------------------

/// Resolve the cookie to a live session or refuse with 401.
pub(crate) async fn require_session(
    st: &AppState,
    headers: &HeaderMap,
) -> Result<Session, ApiError> {
    let token = token_from_headers(headers).ok_or_else(ApiError::unauthorized)?;
    st.sessions
        .get(&token)
        .await
        .ok_or_else(ApiError::unauthorized)
}

/// Like [`require_session`] but additionally refuses non-admin roles with 403.
pub(crate) async fn require_admin(
    st: &AppState,
    headers: &HeaderMap,
) -> Result<Session, ApiError> {
    let session = require_session(st, headers).await?;
    if !session.is_admin() {
        return Err(ApiError::forbidden());
    }
    Ok(session)
}
