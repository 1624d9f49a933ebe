//! Request/response DTOs for the HTTP API.
//!
//! Wire field names keep the Spanish contract the frontend already speaks
//! (`cliente`, `mesa`, `productos`, `codigo_publico`, ...); struct and
//! field identifiers stay English on the Rust side.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    #[serde(rename = "rol")]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(rename = "usuario")]
    pub user: UserInfo,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub id: i64,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    #[serde(rename = "precio")]
    pub unit_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "cliente")]
    pub customer: String,
    #[serde(rename = "mesa")]
    pub table_label: Option<String>,
    #[serde(rename = "productos")]
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    #[serde(rename = "pedido_id")]
    pub order_id: i64,
    #[serde(rename = "codigo_publico")]
    pub tracking_code: String,
    pub total: f64,
    #[serde(rename = "reutilizado")]
    pub reused: bool,
}

/// Partial order update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(rename = "estado")]
    pub status: Option<String>,
    #[serde(rename = "cliente")]
    pub customer: Option<String>,
    #[serde(rename = "mesa")]
    pub table_label: Option<String>,
    pub total: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    #[serde(rename = "estado")]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NewProductRequest {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: f64,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProductRequest {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "precio")]
    pub price: Option<f64>,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(rename = "nombre")]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct SalesQuery {
    #[serde(rename = "periodo")]
    pub period: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TopQuery {
    #[serde(rename = "limite")]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OrderSearchQuery {
    #[serde(rename = "cliente")]
    pub customer: Option<String>,
    #[serde(rename = "estado")]
    pub status: Option<String>,
    #[serde(rename = "desde")]
    pub date_from: Option<String>,
    #[serde(rename = "hasta")]
    pub date_to: Option<String>,
    #[serde(rename = "total_min")]
    pub total_min: Option<f64>,
    #[serde(rename = "total_max")]
    pub total_max: Option<f64>,
    #[serde(rename = "limite")]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListOrdersQuery {
    pub include: Option<String>,
}
