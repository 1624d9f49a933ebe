//! In-memory cookie sessions.
//!
//! Tokens are opaque 32-char alphanumerics mapped server-side to the user.
//! Sessions live until logout or process restart; a restart logs everyone
//! out, which is acceptable for a single-restaurant deployment.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "comanda_session";

const TOKEN_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its token.
    pub async fn create(&self, user_id: i64, username: &str, role: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(rand::distributions::Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        let session = Session {
            user_id,
            username: username.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        self.inner.write().await.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.inner.read().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }
}

/// Pull the session token out of the Cookie header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Set-Cookie value for a fresh login.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/")
}

/// Set-Cookie value that clears the session on logout.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[tokio::test]
    async fn create_get_remove_round_trip() {
        let store = SessionStore::new();
        let token = store.create(1, "admin", "admin").await;

        let session = store.get(&token).await.expect("session exists");
        assert_eq!(session.username, "admin");
        assert!(session.is_admin());

        assert!(store.remove(&token).await);
        assert!(store.get(&token).await.is_none());
        assert!(!store.remove(&token).await);
    }

    #[test]
    fn token_is_parsed_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "other=1; comanda_session=abc123; theme=dark".parse().unwrap(),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_cookie_yields_no_token() {
        let headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert!(token_from_headers(&headers).is_none());
    }

    #[test]
    fn customer_role_is_not_admin() {
        let session = Session {
            user_id: 2,
            username: "cliente".into(),
            role: "customer".into(),
            created_at: Utc::now(),
        };
        assert!(!session.is_admin());
    }
}
