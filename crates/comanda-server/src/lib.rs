//! comanda-server library target.
//!
//! Exposes the router and state for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod error;
pub mod notify;
pub mod routes;
pub mod session;
pub mod state;
