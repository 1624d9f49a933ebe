//! Product catalog queries. Deletion is always soft (`active = false`) so
//! historical order lines keep a valid product reference.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgPool, Row};

#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    pub id: i64,
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
    #[serde(rename = "activo")]
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// Partial update: `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.image.is_none()
            && self.description.is_none()
    }
}

fn row_to_product(row: &sqlx::postgres::PgRow) -> Result<ProductRow> {
    Ok(ProductRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        image: row.try_get("image")?,
        description: row.try_get("description")?,
        active: row.try_get("active")?,
    })
}

/// Active products, grouped the way the menu displays them.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>> {
    let rows = sqlx::query(
        r#"
        select id, name, price, category, image, description, active
        from products
        where active
        order by category, name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("list_products failed")?;

    rows.iter().map(row_to_product).collect()
}

pub async fn fetch_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>> {
    let row = sqlx::query(
        r#"
        select id, name, price, category, image, description, active
        from products
        where id = $1 and active
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("fetch_product failed")?;

    row.as_ref().map(row_to_product).transpose()
}

/// Insert a product row, returning its id.
pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        insert into products (name, price, category, image, description)
        values ($1, $2, $3, $4, $5)
        returning id
        "#,
    )
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.image)
    .bind(&product.description)
    .fetch_one(pool)
    .await
    .context("insert_product failed")?;

    Ok(id)
}

/// Partial update. Returns the number of rows matched (0 = not found).
pub async fn update_product(pool: &PgPool, id: i64, patch: &ProductPatch) -> Result<u64> {
    let mut sets: Vec<String> = Vec::new();
    let mut idx = 1u32;

    if patch.name.is_some() {
        sets.push(format!("name = ${idx}"));
        idx += 1;
    }
    if patch.price.is_some() {
        sets.push(format!("price = ${idx}"));
        idx += 1;
    }
    if patch.category.is_some() {
        sets.push(format!("category = ${idx}"));
        idx += 1;
    }
    if patch.image.is_some() {
        sets.push(format!("image = ${idx}"));
        idx += 1;
    }
    if patch.description.is_some() {
        sets.push(format!("description = ${idx}"));
        idx += 1;
    }

    if sets.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "update products set {} where id = ${idx}",
        sets.join(", ")
    );

    let mut query = sqlx::query(&sql);
    if let Some(name) = &patch.name {
        query = query.bind(name);
    }
    if let Some(price) = patch.price {
        query = query.bind(price);
    }
    if let Some(category) = &patch.category {
        query = query.bind(category);
    }
    if let Some(image) = &patch.image {
        query = query.bind(image);
    }
    if let Some(description) = &patch.description {
        query = query.bind(description);
    }

    let res = query
        .bind(id)
        .execute(pool)
        .await
        .context("update_product failed")?;

    Ok(res.rows_affected())
}

/// Soft delete. Returns rows matched (0 = not found).
pub async fn soft_delete_product(pool: &PgPool, id: i64) -> Result<u64> {
    let res = sqlx::query("update products set active = false where id = $1 and active")
        .bind(id)
        .execute(pool)
        .await
        .context("soft_delete_product failed")?;

    Ok(res.rows_affected())
}
