//! Order and order-line status enum.
//!
//! One flat five-value enum shared by orders and their lines; no transition
//! graph is enforced, any status may be set from any other by an authorized
//! caller. The wire spellings are part of the public API contract.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "In-Preparation")]
    InPreparation,
    #[serde(rename = "Ready")]
    Ready,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InPreparation => "In-Preparation",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "In-Preparation" => Ok(OrderStatus::InPreparation),
            "Ready" => Ok(OrderStatus::Ready),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(anyhow!("invalid order status: {}", other)),
        }
    }

    /// List-view sort priority: kitchen-active work first.
    pub fn priority(&self) -> i32 {
        match self {
            OrderStatus::Pending => 1,
            OrderStatus::InPreparation => 2,
            OrderStatus::Ready => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    /// Terminal statuses are excluded from the merge-target lookup.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// SQL CASE ladder mirroring [`OrderStatus::priority`], with unknown text
/// sorting last. `{col}` is substituted by callers with a qualified column.
pub(crate) fn ladder_sql(col: &str) -> String {
    format!(
        "case \
         when {col} = 'Pending' then 1 \
         when {col} = 'In-Preparation' then 2 \
         when {col} = 'Ready' then 3 \
         when {col} = 'Delivered' then 4 \
         when {col} = 'Cancelled' then 5 \
         else 6 end"
    )
}
