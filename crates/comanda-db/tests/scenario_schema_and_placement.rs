/// DB-backed scenarios, skipped if COMANDA_DATABASE_URL is not set.
use comanda_db::orders::{NewOrder, NewOrderLine};
use sqlx::PgPool;

async fn pool_or_skip() -> anyhow::Result<Option<PgPool>> {
    let url = match std::env::var(comanda_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: COMANDA_DATABASE_URL not set");
            return Ok(None);
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;

    Ok(Some(pool))
}

/// Running schema bring-up twice must be a no-op the second time.
#[tokio::test]
async fn ensure_schema_is_idempotent() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };

    comanda_db::ensure_schema(&pool).await?;
    comanda_db::ensure_schema(&pool).await?;

    let status = comanda_db::db_status(&pool).await?;
    assert!(status.ok);
    assert!(status.has_orders_table);

    Ok(())
}

/// A second placement by the same customer inside the reuse window lands
/// on the first order and adds to its total; the tracking code survives.
#[tokio::test]
async fn placement_merges_into_recent_open_order() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    comanda_db::ensure_schema(&pool).await?;

    // Unique customer per run so reruns never collide.
    let customer = format!("merge-test-{}", comanda_db::orders::generate_tracking_code());

    let product_id = comanda_db::products::insert_product(
        &pool,
        &comanda_db::products::NewProduct {
            name: "Hamburguesa Clásica".into(),
            price: 10.0,
            category: None,
            image: None,
            description: None,
        },
    )
    .await?;

    let first = comanda_db::place_order(
        &pool,
        &NewOrder {
            customer: customer.clone(),
            table_label: None,
            lines: vec![NewOrderLine {
                product_id,
                quantity: 2,
                unit_price: 10.0,
            }],
        },
    )
    .await?;
    assert!(!first.reused);
    assert_eq!(first.total, 20.0);

    let second = comanda_db::place_order(
        &pool,
        &NewOrder {
            customer: customer.clone(),
            table_label: None,
            lines: vec![NewOrderLine {
                product_id,
                quantity: 1,
                unit_price: 5.0,
            }],
        },
    )
    .await?;
    assert!(second.reused);
    assert_eq!(second.order_id, first.order_id);
    assert_eq!(second.tracking_code, first.tracking_code);
    assert_eq!(second.total, 25.0);

    let detail = comanda_db::orders::fetch_order(&pool, first.order_id)
        .await?
        .expect("merged order must exist");
    assert_eq!(detail.summary.total, 25.0);
    assert_eq!(detail.lines.len(), 2);

    comanda_db::orders::delete_order(&pool, first.order_id).await?;
    comanda_db::products::soft_delete_product(&pool, product_id).await?;

    Ok(())
}

/// A delivered order stops attracting merges; the next placement gets a
/// fresh order and a fresh tracking code.
#[tokio::test]
async fn delivered_order_is_not_a_merge_target() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    comanda_db::ensure_schema(&pool).await?;

    let customer = format!("closed-test-{}", comanda_db::orders::generate_tracking_code());

    let product_id = comanda_db::products::insert_product(
        &pool,
        &comanda_db::products::NewProduct {
            name: "Refresco".into(),
            price: 3.0,
            category: None,
            image: None,
            description: None,
        },
    )
    .await?;

    let first = comanda_db::place_order(
        &pool,
        &NewOrder {
            customer: customer.clone(),
            table_label: None,
            lines: vec![NewOrderLine {
                product_id,
                quantity: 1,
                unit_price: 3.0,
            }],
        },
    )
    .await?;

    comanda_db::orders::update_order(
        &pool,
        first.order_id,
        &comanda_db::orders::OrderPatch {
            status: Some(comanda_db::OrderStatus::Delivered),
            ..Default::default()
        },
    )
    .await?;

    let second = comanda_db::place_order(
        &pool,
        &NewOrder {
            customer: customer.clone(),
            table_label: None,
            lines: vec![NewOrderLine {
                product_id,
                quantity: 2,
                unit_price: 3.0,
            }],
        },
    )
    .await?;

    assert!(!second.reused);
    assert_ne!(second.order_id, first.order_id);
    assert_ne!(second.tracking_code, first.tracking_code);

    comanda_db::orders::delete_order(&pool, first.order_id).await?;
    comanda_db::orders::delete_order(&pool, second.order_id).await?;
    comanda_db::products::soft_delete_product(&pool, product_id).await?;

    Ok(())
}
