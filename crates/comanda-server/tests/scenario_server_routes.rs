//! In-process scenario tests for comanda-server HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot` — no network I/O required. The pool is
//! lazy, so paths that refuse before touching storage (auth gates, input
//! validation) run without a database.

use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use comanda_server::{routes, state};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a fresh AppState over a lazy pool (no connection is attempted
/// until a handler actually runs a query).
fn make_state() -> Arc<state::AppState> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/comanda_unused")
        .expect("lazy pool");
    Arc::new(state::AppState::new(pool))
}

fn make_router() -> axum::Router {
    routes::build_router(make_state())
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn json_req(method: &str, uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut req: Request<axum::body::Body>, token: &str) -> Request<axum::body::Body> {
    req.headers_mut().insert(
        header::COOKIE,
        format!("comanda_session={token}").parse().unwrap(),
    );
    req
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "comanda-server");
}

// ---------------------------------------------------------------------------
// Auth gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_create_without_session_is_401() {
    let req = json_req(
        "POST",
        "/api/productos",
        serde_json::json!({"nombre": "Tacos", "precio": 8.5}),
    );
    let (status, body) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(parse_json(body)["error"], "unauthorized");
}

#[tokio::test]
async fn product_create_with_customer_session_is_403() {
    let st = make_state();
    let token = st.sessions.create(2, "cliente", "customer").await;

    let req = with_cookie(
        json_req(
            "POST",
            "/api/productos",
            serde_json::json!({"nombre": "Tacos", "precio": 8.5}),
        ),
        &token,
    );
    let (status, body) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["error"], "forbidden");
}

#[tokio::test]
async fn analytics_requires_admin() {
    let st = make_state();
    let token = st.sessions.create(2, "cliente", "customer").await;

    let (status, _) = call(
        routes::build_router(Arc::clone(&st)),
        get("/api/analytics/resumen"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = with_cookie(get("/api/analytics/resumen"), &token);
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn order_list_requires_admin() {
    let (status, _) = call(make_router(), get("/api/pedidos")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let st = make_state();
    let token = st.sessions.create(2, "cliente", "customer").await;
    let req = with_cookie(get("/api/pedidos"), &token);
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

/// Staff order routes refuse customer sessions across the board, reads
/// and status writes alike.
#[tokio::test]
async fn staff_order_routes_refuse_customer_sessions() {
    let st = make_state();
    let token = st.sessions.create(2, "cliente", "customer").await;

    for uri in [
        "/api/pedidos/agrupados",
        "/api/pedidos/grupo/AB12C",
        "/api/pedidos/7",
        "/api/pedidos/7/lineas",
    ] {
        let req = with_cookie(get(uri), &token);
        let (status, _) = call(routes::build_router(Arc::clone(&st)), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "GET {uri}");
    }

    let req = with_cookie(
        json_req("PUT", "/api/pedidos/7", serde_json::json!({"estado": "Ready"})),
        &token,
    );
    let (status, _) = call(routes::build_router(Arc::clone(&st)), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = with_cookie(
        json_req(
            "PUT",
            "/api/pedidos/lineas/7",
            serde_json::json!({"estado": "Ready"}),
        ),
        &token,
    );
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Input validation (refused before any storage access)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn placement_with_no_lines_is_400() {
    let req = json_req(
        "POST",
        "/api/pedidos",
        serde_json::json!({"cliente": "Luis", "productos": []}),
    );
    let (status, body) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["error"], "bad_request");
}

#[tokio::test]
async fn placement_with_blank_customer_is_400() {
    let req = json_req(
        "POST",
        "/api/pedidos",
        serde_json::json!({
            "cliente": "   ",
            "productos": [{"id": 1, "cantidad": 1, "precio": 5.0}]
        }),
    );
    let (status, _) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn placement_with_nonpositive_quantity_is_400() {
    let req = json_req(
        "POST",
        "/api/pedidos",
        serde_json::json!({
            "cliente": "Luis",
            "productos": [{"id": 1, "cantidad": 0, "precio": 5.0}]
        }),
    );
    let (status, _) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_update_with_unknown_status_is_400() {
    let st = make_state();
    let token = st.sessions.create(1, "admin", "admin").await;

    let req = with_cookie(
        json_req("PUT", "/api/pedidos/1", serde_json::json!({"estado": "Pendiente"})),
        &token,
    );
    let (status, body) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("invalid order status"));
}

/// An unrecognized line status is refused before any storage access, so
/// no row can be modified.
#[tokio::test]
async fn line_update_with_unknown_status_is_400() {
    let st = make_state();
    let token = st.sessions.create(1, "admin", "admin").await;

    let req = with_cookie(
        json_req(
            "PUT",
            "/api/pedidos/lineas/1",
            serde_json::json!({"estado": "Listo"}),
        ),
        &token,
    );
    let (status, body) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("invalid order status"));
}

#[tokio::test]
async fn order_update_with_no_fields_is_400() {
    let st = make_state();
    let token = st.sessions.create(1, "admin", "admin").await;

    let req = with_cookie(
        json_req("PUT", "/api/pedidos/1", serde_json::json!({})),
        &token,
    );
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sales_with_unknown_period_is_400() {
    let st = make_state();
    let token = st.sessions.create(1, "admin", "admin").await;

    let req = with_cookie(get("/api/analytics/ventas?periodo=trimestre"), &token);
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_blank_credentials_is_400() {
    let req = json_req(
        "POST",
        "/api/auth/login",
        serde_json::json!({"username": "", "password": ""}),
    );
    let (status, _) = call(make_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Session round trip (store-level; no DB involved)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whoami_reflects_the_session_and_logout_ends_it() {
    let st = make_state();
    let token = st.sessions.create(1, "admin", "admin").await;

    let req = with_cookie(get("/api/auth/session"), &token);
    let (status, body) = call(routes::build_router(Arc::clone(&st)), req).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["usuario"]["username"], "admin");
    assert_eq!(json["usuario"]["rol"], "admin");

    let req = with_cookie(
        json_req("POST", "/api/auth/logout", serde_json::json!({})),
        &token,
    );
    let (status, _) = call(routes::build_router(Arc::clone(&st)), req).await;
    assert_eq!(status, StatusCode::OK);

    let req = with_cookie(get("/api/auth/session"), &token);
    let (status, _) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
