//! Order placement, aggregation and lifecycle.
//!
//! Placement merges into the customer's most recent open order when one
//! exists inside the reuse window; otherwise a fresh order with a new
//! tracking code is created. The merge target is re-checked under
//! `FOR UPDATE` inside the transaction, so two concurrent placements for
//! the same customer serialize instead of double-applying the total.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::status::{ladder_sql, OrderStatus};

/// How far back a customer's open order still attracts new lines.
pub const REUSE_WINDOW_HOURS: i64 = 6;

const TRACKING_CODE_LEN: usize = 5;
const TRACKING_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Monetary rounding to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn generate_tracking_code() -> String {
    let mut rng = rand::thread_rng();
    (0..TRACKING_CODE_LEN)
        .map(|_| TRACKING_CODE_ALPHABET[rng.gen_range(0..TRACKING_CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: String,
    pub table_label: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn total(&self) -> f64 {
        round2(
            self.lines
                .iter()
                .map(|l| round2(l.unit_price * l.quantity as f64))
                .sum(),
        )
    }
}

/// Outcome of [`place_order`]. `reused` is true when the lines landed on an
/// existing open order; `tracking_code` is then that order's original code.
#[derive(Debug, Clone)]
pub struct OrderPlacement {
    pub order_id: i64,
    pub tracking_code: String,
    pub total: f64,
    pub reused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    #[serde(rename = "cliente")]
    pub customer: String,
    #[serde(rename = "mesa")]
    pub table_label: Option<String>,
    #[serde(rename = "estado")]
    pub status: String,
    pub total: f64,
    #[serde(rename = "fecha")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "codigo_publico")]
    pub tracking_code: String,
    /// Denormalized "Nombre x2, Otro x1" list for list views.
    #[serde(rename = "productos")]
    pub products_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineRow {
    pub id: i64,
    #[serde(rename = "producto_id")]
    pub product_id: Option<i64>,
    #[serde(rename = "nombre")]
    pub product_name: Option<String>,
    #[serde(rename = "precio")]
    pub unit_price: Option<f64>,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
    pub subtotal: f64,
    #[serde(rename = "estado")]
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub summary: OrderSummary,
    #[serde(rename = "lineas")]
    pub lines: Vec<OrderLineRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderGroup {
    #[serde(rename = "codigo_publico")]
    pub tracking_code: String,
    #[serde(rename = "cliente")]
    pub customer: String,
    #[serde(rename = "cantidad")]
    pub order_count: i64,
    #[serde(rename = "fecha")]
    pub latest_at: DateTime<Utc>,
    pub total: f64,
    #[serde(rename = "estados")]
    pub statuses: Vec<String>,
}

/// Partial update; `None` fields untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub customer: Option<String>,
    pub table_label: Option<Option<String>>,
    pub total: Option<f64>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.customer.is_none()
            && self.table_label.is_none()
            && self.total.is_none()
    }
}

/// The customer's most recent non-terminal order inside the reuse window.
pub async fn find_active_order(
    pool: &PgPool,
    customer: &str,
) -> Result<Option<(i64, String, f64)>> {
    let row = sqlx::query(
        r#"
        select id, tracking_code, total
        from orders
        where customer = $1
          and status not in ('Delivered', 'Cancelled')
          and created_at > now() - make_interval(hours => $2)
        order by created_at desc
        limit 1
        "#,
    )
    .bind(customer)
    .bind(REUSE_WINDOW_HOURS as i32)
    .fetch_optional(pool)
    .await
    .context("find_active_order failed")?;

    row.map(|r| {
        Ok((
            r.try_get::<i64, _>("id")?,
            r.try_get::<String, _>("tracking_code")?,
            r.try_get::<f64, _>("total")?,
        ))
    })
    .transpose()
}

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    lines: &[NewOrderLine],
) -> Result<()> {
    for line in lines {
        sqlx::query(
            r#"
            insert into order_lines (order_id, product_id, quantity, subtotal, status)
            values ($1, $2, $3, $4, 'Pending')
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(round2(line.unit_price * line.quantity as f64))
        .execute(&mut **tx)
        .await
        .context("order line insert failed")?;
    }
    Ok(())
}

/// Place an order: merge into the customer's open order when one exists
/// inside the reuse window, otherwise create a fresh one.
///
/// The pre-transaction lookup is advisory only. If it errors we log and
/// fall through to the create path rather than failing the placement; if
/// it hits, the target is re-validated under a row lock before any write.
pub async fn place_order(pool: &PgPool, order: &NewOrder) -> Result<OrderPlacement> {
    if order.customer.trim().is_empty() {
        bail!("customer name is required");
    }
    if order.lines.is_empty() {
        bail!("an order needs at least one line");
    }
    for line in &order.lines {
        if line.quantity <= 0 {
            bail!("line quantity must be positive");
        }
        if line.unit_price < 0.0 {
            bail!("line price must not be negative");
        }
    }

    let submitted_total = order.total();

    let peek = match find_active_order(pool, &order.customer).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(error = %err, customer = %order.customer,
                "active-order lookup failed, creating a new order");
            None
        }
    };

    let mut tx = pool.begin().await.context("begin placement tx failed")?;

    if let Some((candidate_id, _, _)) = peek {
        // Re-check under lock: the candidate may have been delivered,
        // cancelled or deleted since the peek.
        let locked = sqlx::query(
            r#"
            select id, tracking_code, total
            from orders
            where id = $1
              and status not in ('Delivered', 'Cancelled')
              and created_at > now() - make_interval(hours => $2)
            for update
            "#,
        )
        .bind(candidate_id)
        .bind(REUSE_WINDOW_HOURS as i32)
        .fetch_optional(&mut *tx)
        .await
        .context("merge target re-check failed")?;

        if let Some(row) = locked {
            let order_id: i64 = row.try_get("id")?;
            let tracking_code: String = row.try_get("tracking_code")?;
            let current_total: f64 = row.try_get("total")?;
            let new_total = round2(current_total + submitted_total);

            sqlx::query("update orders set total = $1 where id = $2")
                .bind(new_total)
                .bind(order_id)
                .execute(&mut *tx)
                .await
                .context("merge total update failed")?;

            insert_lines(&mut tx, order_id, &order.lines).await?;

            tx.commit().await.context("merge commit failed")?;

            return Ok(OrderPlacement {
                order_id,
                tracking_code,
                total: new_total,
                reused: true,
            });
        }
    }

    let tracking_code = generate_tracking_code();

    let (order_id,): (i64,) = sqlx::query_as(
        r#"
        insert into orders (customer, table_label, total, tracking_code)
        values ($1, $2, $3, $4)
        returning id
        "#,
    )
    .bind(&order.customer)
    .bind(&order.table_label)
    .bind(submitted_total)
    .bind(&tracking_code)
    .fetch_one(&mut *tx)
    .await
    .context("order insert failed")?;

    insert_lines(&mut tx, order_id, &order.lines).await?;

    tx.commit().await.context("placement commit failed")?;

    Ok(OrderPlacement {
        order_id,
        tracking_code,
        total: submitted_total,
        reused: false,
    })
}

fn summary_select(where_clause: &str) -> String {
    format!(
        r#"
        select o.id, o.customer, o.table_label, o.status, o.total,
               o.created_at, o.tracking_code,
               string_agg(p.name || ' x' || l.quantity, ', ' order by l.id)
                   as products_summary
        from orders o
        left join order_lines l on l.order_id = o.id
        left join products p on p.id = l.product_id
        {where_clause}
        group by o.id
        order by {ladder}, o.created_at desc
        "#,
        ladder = ladder_sql("o.status"),
    )
}

fn row_to_summary(row: &sqlx::postgres::PgRow) -> Result<OrderSummary> {
    Ok(OrderSummary {
        id: row.try_get("id")?,
        customer: row.try_get("customer")?,
        table_label: row.try_get("table_label")?,
        status: row.try_get("status")?,
        total: row.try_get("total")?,
        created_at: row.try_get("created_at")?,
        tracking_code: row.try_get("tracking_code")?,
        products_summary: row.try_get("products_summary")?,
    })
}

/// Every order, kitchen-active first, newest first within a status.
pub async fn list_orders(pool: &PgPool) -> Result<Vec<OrderSummary>> {
    let sql = summary_select("");
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("list_orders failed")?;

    rows.iter().map(row_to_summary).collect()
}

pub async fn order_lines(pool: &PgPool, order_id: i64) -> Result<Vec<OrderLineRow>> {
    let rows = sqlx::query(
        r#"
        select l.id, l.product_id, p.name as product_name, p.price as unit_price,
               l.quantity, l.subtotal, l.status
        from order_lines l
        left join products p on p.id = l.product_id
        where l.order_id = $1
        order by l.id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("order_lines failed")?;

    rows.iter()
        .map(|r| {
            Ok(OrderLineRow {
                id: r.try_get("id")?,
                product_id: r.try_get("product_id")?,
                product_name: r.try_get("product_name")?,
                unit_price: r.try_get("unit_price")?,
                quantity: r.try_get("quantity")?,
                subtotal: r.try_get("subtotal")?,
                status: r.try_get("status")?,
            })
        })
        .collect()
}

pub async fn fetch_order(pool: &PgPool, id: i64) -> Result<Option<OrderDetail>> {
    let sql = summary_select("where o.id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?;

    let Some(row) = row else { return Ok(None) };
    let summary = row_to_summary(&row)?;
    let lines = order_lines(pool, summary.id).await?;
    Ok(Some(OrderDetail { summary, lines }))
}

/// Public order tracking by code; no authentication involved.
pub async fn fetch_order_by_code(pool: &PgPool, code: &str) -> Result<Option<OrderDetail>> {
    let sql = summary_select("where o.tracking_code = $1");
    let row = sqlx::query(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("fetch_order_by_code failed")?;

    let Some(row) = row else { return Ok(None) };
    let summary = row_to_summary(&row)?;
    let lines = order_lines(pool, summary.id).await?;
    Ok(Some(OrderDetail { summary, lines }))
}

/// Partial update. Returns rows matched (0 = not found).
pub async fn update_order(pool: &PgPool, id: i64, patch: &OrderPatch) -> Result<u64> {
    let mut sets: Vec<String> = Vec::new();
    let mut idx = 1u32;

    if patch.status.is_some() {
        sets.push(format!("status = ${idx}"));
        idx += 1;
    }
    if patch.customer.is_some() {
        sets.push(format!("customer = ${idx}"));
        idx += 1;
    }
    if patch.table_label.is_some() {
        sets.push(format!("table_label = ${idx}"));
        idx += 1;
    }
    if patch.total.is_some() {
        sets.push(format!("total = ${idx}"));
        idx += 1;
    }

    if sets.is_empty() {
        return Ok(0);
    }

    let sql = format!("update orders set {} where id = ${idx}", sets.join(", "));

    let mut query = sqlx::query(&sql);
    if let Some(status) = patch.status {
        query = query.bind(status.as_str());
    }
    if let Some(customer) = &patch.customer {
        query = query.bind(customer);
    }
    if let Some(table_label) = &patch.table_label {
        query = query.bind(table_label);
    }
    if let Some(total) = patch.total {
        query = query.bind(round2(total));
    }

    let res = query
        .bind(id)
        .execute(pool)
        .await
        .context("update_order failed")?;

    Ok(res.rows_affected())
}

/// Set one line's kitchen status. Returns the owning order id when the
/// line exists, so callers can notify the right tracking room.
pub async fn update_line_status(
    pool: &PgPool,
    line_id: i64,
    status: OrderStatus,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        "update order_lines set status = $1 where id = $2 returning order_id",
    )
    .bind(status.as_str())
    .bind(line_id)
    .fetch_optional(pool)
    .await
    .context("update_line_status failed")?;

    row.map(|r| Ok(r.try_get::<i64, _>("order_id")?)).transpose()
}

/// Hard delete; lines go with the order via the FK cascade.
/// Returns the tracking code when the order existed.
pub async fn delete_order(pool: &PgPool, id: i64) -> Result<Option<String>> {
    let row = sqlx::query("delete from orders where id = $1 returning tracking_code")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("delete_order failed")?;

    row.map(|r| Ok(r.try_get::<String, _>("tracking_code")?))
        .transpose()
}

/// Orders rolled up per (tracking code, customer), newest group first.
/// Under the unique-code constraint a group is usually one order; the
/// rollup shape survives from databases predating that constraint.
pub async fn order_groups(pool: &PgPool) -> Result<Vec<OrderGroup>> {
    let rows = sqlx::query(
        r#"
        select tracking_code, customer,
               count(*) as order_count,
               max(created_at) as latest_at,
               sum(total) as total,
               array_agg(distinct status) as statuses
        from orders
        group by tracking_code, customer
        order by latest_at desc
        "#,
    )
    .fetch_all(pool)
    .await
    .context("order_groups failed")?;

    rows.iter()
        .map(|r| {
            Ok(OrderGroup {
                tracking_code: r.try_get("tracking_code")?,
                customer: r.try_get("customer")?,
                order_count: r.try_get("order_count")?,
                latest_at: r.try_get("latest_at")?,
                total: round2(r.try_get("total")?),
                statuses: r.try_get("statuses")?,
            })
        })
        .collect()
}

/// Every order sharing a tracking code, each with its full line set.
pub async fn orders_in_group(pool: &PgPool, code: &str) -> Result<Vec<OrderDetail>> {
    let sql = summary_select("where o.tracking_code = $1");
    let rows = sqlx::query(&sql)
        .bind(code)
        .fetch_all(pool)
        .await
        .context("orders_in_group failed")?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        let summary = row_to_summary(row)?;
        let lines = order_lines(pool, summary.id).await?;
        details.push(OrderDetail { summary, lines });
    }
    Ok(details)
}

/// Line sets for every order at once, keyed by order id. Backs the
/// `include=detalles` list view without a per-order query.
pub async fn all_order_lines(pool: &PgPool) -> Result<Vec<(i64, OrderLineRow)>> {
    let rows = sqlx::query(
        r#"
        select l.order_id, l.id, l.product_id, p.name as product_name,
               p.price as unit_price, l.quantity, l.subtotal, l.status
        from order_lines l
        left join products p on p.id = l.product_id
        order by l.order_id, l.id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("all_order_lines failed")?;

    rows.iter()
        .map(|r| {
            Ok((
                r.try_get::<i64, _>("order_id")?,
                OrderLineRow {
                    id: r.try_get("id")?,
                    product_id: r.try_get("product_id")?,
                    product_name: r.try_get("product_name")?,
                    unit_price: r.try_get("unit_price")?,
                    quantity: r.try_get("quantity")?,
                    subtotal: r.try_get("subtotal")?,
                    status: r.try_get("status")?,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_snaps_to_cents() {
        assert_eq!(round2(10.006), 10.01);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(25.0), 25.0);
    }

    #[test]
    fn tracking_codes_are_five_uppercase_base36_chars() {
        for _ in 0..50 {
            let code = generate_tracking_code();
            assert_eq!(code.len(), 5);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn order_total_sums_rounded_line_subtotals() {
        let order = NewOrder {
            customer: "Luis".into(),
            table_label: None,
            lines: vec![
                NewOrderLine {
                    product_id: 1,
                    quantity: 2,
                    unit_price: 10.0,
                },
                NewOrderLine {
                    product_id: 2,
                    quantity: 1,
                    unit_price: 5.0,
                },
            ],
        };
        assert_eq!(order.total(), 25.0);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(OrderPatch::default().is_empty());
        let patch = OrderPatch {
            status: Some(OrderStatus::Ready),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn summary_serializes_spanish_wire_names() {
        let summary = OrderSummary {
            id: 7,
            customer: "Ana".into(),
            table_label: Some("M4".into()),
            status: "Pending".into(),
            total: 25.0,
            created_at: Utc::now(),
            tracking_code: "AB12C".into(),
            products_summary: Some("Hamburguesa x2".into()),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["cliente"], "Ana");
        assert_eq!(json["mesa"], "M4");
        assert_eq!(json["estado"], "Pending");
        assert_eq!(json["codigo_publico"], "AB12C");
        assert_eq!(json["productos"], "Hamburguesa x2");
    }
}
