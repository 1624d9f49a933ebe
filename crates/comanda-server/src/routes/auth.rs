//! Cookie-session auth: login, logout, whoami.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use comanda_db::users::verify_password;

use crate::api_types::{LoginRequest, LoginResponse, UserInfo};
use crate::error::ApiError;
use crate::routes::require_session;
use crate::session::{clear_session_cookie, session_cookie, token_from_headers};
use crate::state::AppState;

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let user = comanda_db::users::fetch_user_by_username(&st.db, req.username.trim()).await?;

    // Same refusal for unknown user and wrong password.
    let Some(user) = user.filter(|u| verify_password(&req.password, &u.password_hash)) else {
        tracing::info!(username = %req.username.trim(), "login refused");
        return Err(ApiError::unauthorized());
    };

    let token = st
        .sessions
        .create(user.id, &user.username, &user.role)
        .await;
    tracing::info!(username = %user.username, role = %user.role, "login");

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&token)
            .parse()
            .map_err(|_| ApiError::internal(anyhow::anyhow!("cookie header build failed")))?,
    );

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            success: true,
            user: UserInfo {
                id: user.id,
                username: user.username,
                role: user.role,
            },
        }),
    ))
}

pub(crate) async fn logout(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = token_from_headers(&headers) {
        st.sessions.remove(&token).await;
    }

    let mut out = HeaderMap::new();
    out.insert(
        SET_COOKIE,
        clear_session_cookie()
            .parse()
            .map_err(|_| ApiError::internal(anyhow::anyhow!("cookie header build failed")))?,
    );
    Ok((StatusCode::OK, out, Json(json!({ "success": true }))))
}

pub(crate) async fn whoami(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&st, &headers).await?;
    Ok(Json(json!({
        "success": true,
        "usuario": {
            "id": session.user_id,
            "username": session.username,
            "rol": session.role,
        }
    })))
}
