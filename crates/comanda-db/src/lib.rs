//! Persistence gateway for the comanda backend.
//!
//! All business operations go through the plain async functions in the
//! submodules; each takes an explicit `&PgPool` so callers own the handle
//! (no process-wide connection singleton). Schema bring-up is idempotent
//! and runs once at process start before the server accepts traffic.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub mod analytics;
pub mod categories;
pub mod orders;
pub mod products;
pub mod status;
pub mod users;

pub use orders::{place_order, round2, NewOrder, NewOrderLine, OrderPlacement};
pub use status::OrderStatus;

pub const ENV_DB_URL: &str = "COMANDA_DATABASE_URL";

/// Connect to Postgres using COMANDA_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Idempotent schema bring-up: create-if-absent for every table, then
/// additive column evolution, then default user seeding.
///
/// Safe to run on every boot; a second run on the same database is a no-op.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let tables = [
        r#"
        create table if not exists products (
            id bigserial primary key,
            name text not null,
            price double precision not null,
            category text,
            image text,
            description text,
            active boolean not null default true
        )
        "#,
        r#"
        create table if not exists categories (
            id bigserial primary key,
            name text unique not null,
            active boolean not null default true
        )
        "#,
        r#"
        create table if not exists orders (
            id bigserial primary key,
            customer text not null,
            table_label text,
            status text not null default 'Pending',
            total double precision not null default 0,
            created_at timestamptz not null default now(),
            tracking_code text unique not null
        )
        "#,
        r#"
        create table if not exists order_lines (
            id bigserial primary key,
            order_id bigint not null references orders(id) on delete cascade,
            product_id bigint references products(id),
            quantity integer not null,
            subtotal double precision not null
        )
        "#,
        r#"
        create table if not exists users (
            id bigserial primary key,
            username text unique not null,
            password_hash text not null,
            role text not null default 'customer',
            active boolean not null default true,
            created_at timestamptz not null default now()
        )
        "#,
    ];

    for (i, ddl) in tables.iter().enumerate() {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("schema bring-up failed for table {}", i + 1))?;
    }

    // Additive evolution: per-line kitchen status arrived after the first
    // deployments, so older databases gain the column here.
    sqlx::query(
        "alter table order_lines add column if not exists status text not null default 'Pending'",
    )
    .execute(pool)
    .await
    .context("schema evolution failed for order_lines.status")?;

    users::seed_default_users(pool)
        .await
        .context("default user seeding failed")?;

    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn db_status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}
