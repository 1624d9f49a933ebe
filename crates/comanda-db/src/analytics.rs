//! Sales analytics read models. Everything here is read-only aggregation
//! over orders and lines; cancelled orders never count toward revenue.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::orders::{round2, OrderSummary};
use crate::status::{ladder_sql, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesPeriod {
    Day,
    Week,
    Month,
}

impl SalesPeriod {
    /// Wire values are the Spanish period names the dashboard sends.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "dia" => Ok(SalesPeriod::Day),
            "semana" => Ok(SalesPeriod::Week),
            "mes" => Ok(SalesPeriod::Month),
            other => Err(anyhow!("invalid sales period: {}", other)),
        }
    }

    fn bucket_expr(&self) -> &'static str {
        match self {
            SalesPeriod::Day => "to_char(created_at, 'YYYY-MM-DD')",
            SalesPeriod::Week => "to_char(date_trunc('week', created_at), 'YYYY-MM-DD')",
            SalesPeriod::Month => "to_char(created_at, 'YYYY-MM')",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesBucket {
    #[serde(rename = "periodo")]
    pub label: String,
    #[serde(rename = "pedidos")]
    pub orders: i64,
    #[serde(rename = "ventas")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "unidades")]
    pub units: i64,
    #[serde(rename = "ventas")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCustomer {
    #[serde(rename = "cliente")]
    pub customer: String,
    #[serde(rename = "pedidos")]
    pub orders: i64,
    #[serde(rename = "ventas")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueTotals {
    #[serde(rename = "hoy")]
    pub today: f64,
    #[serde(rename = "semana")]
    pub week: f64,
    #[serde(rename = "mes")]
    pub month: f64,
    #[serde(rename = "historico")]
    pub all_time: f64,
    #[serde(rename = "pedidos")]
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "cantidad")]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourBucket {
    #[serde(rename = "hora")]
    pub hour: i32,
    #[serde(rename = "pedidos")]
    pub orders: i64,
    #[serde(rename = "ventas")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySales {
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "dia")]
    pub weekday: String,
    #[serde(rename = "pedidos")]
    pub orders: i64,
    #[serde(rename = "ventas")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Default)]
pub struct OrderSearch {
    pub customer: Option<String>,
    pub status: Option<OrderStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub total_min: Option<f64>,
    pub total_max: Option<f64>,
    pub limit: Option<i64>,
}

const SPANISH_WEEKDAYS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

fn spanish_weekday(date: NaiveDate) -> &'static str {
    SPANISH_WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

pub async fn sales_by_period(pool: &PgPool, period: SalesPeriod) -> Result<Vec<SalesBucket>> {
    let sql = format!(
        r#"
        select {bucket} as label, count(*) as orders, sum(total) as revenue
        from orders
        where status <> 'Cancelled'
        group by label
        order by label desc
        limit 30
        "#,
        bucket = period.bucket_expr(),
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("sales_by_period failed")?;

    rows.iter()
        .map(|r| {
            Ok(SalesBucket {
                label: r.try_get("label")?,
                orders: r.try_get("orders")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

pub async fn top_products(pool: &PgPool, limit: i64) -> Result<Vec<TopProduct>> {
    let rows = sqlx::query(
        r#"
        select p.name, sum(l.quantity)::bigint as units, sum(l.subtotal) as revenue
        from order_lines l
        join products p on p.id = l.product_id
        join orders o on o.id = l.order_id
        where o.status <> 'Cancelled'
        group by p.name
        order by units desc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("top_products failed")?;

    rows.iter()
        .map(|r| {
            Ok(TopProduct {
                name: r.try_get("name")?,
                units: r.try_get("units")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

pub async fn top_customers(pool: &PgPool, limit: i64) -> Result<Vec<TopCustomer>> {
    let rows = sqlx::query(
        r#"
        select customer, count(*) as orders, sum(total) as revenue
        from orders
        where status <> 'Cancelled'
        group by customer
        order by revenue desc
        limit $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("top_customers failed")?;

    rows.iter()
        .map(|r| {
            Ok(TopCustomer {
                customer: r.try_get("customer")?,
                orders: r.try_get("orders")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

/// One-shot dashboard header numbers. A single pass with filtered
/// aggregates instead of four separate count queries.
pub async fn revenue_totals(pool: &PgPool) -> Result<RevenueTotals> {
    let row = sqlx::query(
        r#"
        select
            coalesce(sum(total) filter (where created_at::date = current_date), 0) as today,
            coalesce(sum(total) filter (
                where created_at >= date_trunc('week', now())), 0) as week,
            coalesce(sum(total) filter (
                where created_at >= date_trunc('month', now())), 0) as month,
            coalesce(sum(total), 0) as all_time,
            count(*) as order_count
        from orders
        where status <> 'Cancelled'
        "#,
    )
    .fetch_one(pool)
    .await
    .context("revenue_totals failed")?;

    Ok(RevenueTotals {
        today: round2(row.try_get("today")?),
        week: round2(row.try_get("week")?),
        month: round2(row.try_get("month")?),
        all_time: round2(row.try_get("all_time")?),
        order_count: row.try_get("order_count")?,
    })
}

pub async fn status_breakdown(pool: &PgPool) -> Result<Vec<StatusCount>> {
    let sql = format!(
        r#"
        select status, count(*) as count
        from orders
        group by status
        order by {ladder}
        "#,
        ladder = ladder_sql("status"),
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("status_breakdown failed")?;

    rows.iter()
        .map(|r| {
            Ok(StatusCount {
                status: r.try_get("status")?,
                count: r.try_get("count")?,
            })
        })
        .collect()
}

pub async fn sales_by_hour(pool: &PgPool) -> Result<Vec<HourBucket>> {
    let rows = sqlx::query(
        r#"
        select extract(hour from created_at)::int as hour,
               count(*) as orders, sum(total) as revenue
        from orders
        where status <> 'Cancelled'
        group by hour
        order by hour
        "#,
    )
    .fetch_all(pool)
    .await
    .context("sales_by_hour failed")?;

    rows.iter()
        .map(|r| {
            Ok(HourBucket {
                hour: r.try_get("hour")?,
                orders: r.try_get("orders")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

fn last_seven_days(today: NaiveDate) -> Vec<NaiveDate> {
    (0..7)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

/// Seven fixed day rows ending today; days without sales show as zeros.
/// The day list is generated server-side so the chart never has holes.
pub async fn weekly_sales(pool: &PgPool) -> Result<Vec<DaySales>> {
    let days = last_seven_days(Utc::now().date_naive());

    let values = days
        .iter()
        .map(|d| format!("('{}'::date)", d.format("%Y-%m-%d")))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        r#"
        with week_days(day) as (values {values})
        select w.day::text as date,
               count(o.id) as orders,
               coalesce(sum(o.total), 0) as revenue
        from week_days w
        left join orders o
            on o.created_at::date = w.day and o.status <> 'Cancelled'
        group by w.day
        order by w.day
        "#,
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .context("weekly_sales failed")?;

    rows.iter()
        .map(|r| {
            let date: String = r.try_get("date")?;
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .context("unexpected date text from weekly sales query")?;
            Ok(DaySales {
                weekday: spanish_weekday(parsed).to_string(),
                date,
                orders: r.try_get("orders")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

/// Daily buckets for the last 30 days, oldest first.
pub async fn sales_trend(pool: &PgPool) -> Result<Vec<SalesBucket>> {
    let rows = sqlx::query(
        r#"
        select to_char(created_at, 'YYYY-MM-DD') as label,
               count(*) as orders, sum(total) as revenue
        from orders
        where status <> 'Cancelled'
          and created_at >= now() - interval '30 days'
        group by label
        order by label
        "#,
    )
    .fetch_all(pool)
    .await
    .context("sales_trend failed")?;

    rows.iter()
        .map(|r| {
            Ok(SalesBucket {
                label: r.try_get("label")?,
                orders: r.try_get("orders")?,
                revenue: round2(r.try_get("revenue")?),
            })
        })
        .collect()
}

/// Filtered order search for the history screen. All filters are optional
/// and combine with AND; `customer` matches case-insensitively anywhere in
/// the name.
pub async fn search_orders(pool: &PgPool, search: &OrderSearch) -> Result<Vec<OrderSummary>> {
    let mut wheres: Vec<String> = Vec::new();

    if search.customer.is_some() {
        wheres.push(format!("o.customer ilike ${}", wheres.len() + 1));
    }
    if search.status.is_some() {
        wheres.push(format!("o.status = ${}", wheres.len() + 1));
    }
    if search.date_from.is_some() {
        wheres.push(format!("o.created_at::date >= ${}", wheres.len() + 1));
    }
    if search.date_to.is_some() {
        wheres.push(format!("o.created_at::date <= ${}", wheres.len() + 1));
    }
    if search.total_min.is_some() {
        wheres.push(format!("o.total >= ${}", wheres.len() + 1));
    }
    if search.total_max.is_some() {
        wheres.push(format!("o.total <= ${}", wheres.len() + 1));
    }

    let where_clause = if wheres.is_empty() {
        String::new()
    } else {
        format!("where {}", wheres.join(" and "))
    };
    let limit = search.limit.unwrap_or(200).clamp(1, 500);

    let sql = format!(
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
        order by o.created_at desc
        limit {limit}
        "#,
    );

    let mut query = sqlx::query(&sql);
    if let Some(customer) = &search.customer {
        query = query.bind(format!("%{customer}%"));
    }
    if let Some(status) = search.status {
        query = query.bind(status.as_str());
    }
    if let Some(from) = search.date_from {
        query = query.bind(from);
    }
    if let Some(to) = search.date_to {
        query = query.bind(to);
    }
    if let Some(min) = search.total_min {
        query = query.bind(min);
    }
    if let Some(max) = search.total_max {
        query = query.bind(max);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("search_orders failed")?;

    rows.iter()
        .map(|r| {
            Ok(OrderSummary {
                id: r.try_get("id")?,
                customer: r.try_get("customer")?,
                table_label: r.try_get("table_label")?,
                status: r.try_get("status")?,
                total: r.try_get("total")?,
                created_at: r.try_get("created_at")?,
                tracking_code: r.try_get("tracking_code")?,
                products_summary: r.try_get("products_summary")?,
            })
        })
        .collect()
}

/// Distinct customer names for the search box autocomplete.
pub async fn distinct_customers(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query("select distinct customer from orders order by customer")
        .fetch_all(pool)
        .await
        .context("distinct_customers failed")?;

    rows.iter()
        .map(|r| Ok(r.try_get::<String, _>("customer")?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_spanish_wire_values() {
        assert_eq!(SalesPeriod::parse("dia").unwrap(), SalesPeriod::Day);
        assert_eq!(SalesPeriod::parse("semana").unwrap(), SalesPeriod::Week);
        assert_eq!(SalesPeriod::parse("mes").unwrap(), SalesPeriod::Month);
        assert!(SalesPeriod::parse("año").is_err());
        assert!(SalesPeriod::parse("day").is_err());
    }

    #[test]
    fn weekday_names_are_spanish() {
        // 2026-08-24 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(spanish_weekday(monday), "Lunes");
        assert_eq!(spanish_weekday(monday + Duration::days(5)), "Sábado");
        assert_eq!(spanish_weekday(monday + Duration::days(6)), "Domingo");
    }

    #[test]
    fn seven_day_window_ends_today() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let days = last_seven_days(today);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 8, 23).unwrap());
        assert_eq!(days[6], today);
        for pair in days.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }
}
