//! Category catalog. Names are unique; deletion is soft so menu history
//! survives a category retirement.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgPool, Row};

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "activo")]
    pub active: bool,
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>> {
    let rows = sqlx::query("select id, name, active from categories where active order by name")
        .fetch_all(pool)
        .await
        .context("list_categories failed")?;

    rows.iter()
        .map(|r| {
            Ok(CategoryRow {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
                active: r.try_get("active")?,
            })
        })
        .collect()
}

/// Insert a category, returning its id. Creating an existing name is not
/// an error: the existing row is revived and its id returned.
pub async fn insert_category(pool: &PgPool, name: &str) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into categories (name) values ($1)
        on conflict (name) do update set active = true
        returning id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .context("insert_category failed")?;

    Ok(id)
}

/// Rename. Returns rows matched (0 = not found).
pub async fn rename_category(pool: &PgPool, id: i64, name: &str) -> Result<u64> {
    let res = sqlx::query("update categories set name = $1 where id = $2 and active")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await
        .context("rename_category failed")?;

    Ok(res.rows_affected())
}

/// Soft delete. Returns rows matched (0 = not found).
pub async fn soft_delete_category(pool: &PgPool, id: i64) -> Result<u64> {
    let res = sqlx::query("update categories set active = false where id = $1 and active")
        .bind(id)
        .execute(pool)
        .await
        .context("soft_delete_category failed")?;

    Ok(res.rows_affected())
}

/// True when the error is Postgres unique-constraint chatter (duplicate name).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.code().as_deref() == Some("23505"))
        .unwrap_or(false)
}
