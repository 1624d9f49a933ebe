//! Shared runtime state for comanda-server.
//!
//! Everything here is `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself.

use serde::Serialize;
use sqlx::PgPool;

use crate::notify::Notifier;
use crate::session::SessionStore;

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    /// Storage handle, injected at construction.
    pub db: PgPool,
    /// WebSocket fan-out (global channel + tracking rooms).
    pub notifier: Notifier,
    /// In-memory cookie sessions.
    pub sessions: SessionStore,
    /// Static build metadata.
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            notifier: Notifier::new(),
            sessions: SessionStore::new(),
            build: BuildInfo {
                service: "comanda-server",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
