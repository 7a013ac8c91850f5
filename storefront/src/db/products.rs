use shared::models::{Category, Product, ProductInput, ProductListItem};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price_in_cents, p.image_path,
    p.is_available_for_purchase,
    ARRAY(SELECT pc.category_id FROM product_categories pc WHERE pc.product_id = p.id) AS category_ids,
    p.created_at, p.updated_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

/// Products a customer can buy, newest first
pub async fn list_available(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p
         WHERE p.is_available_for_purchase = true
         ORDER BY p.created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Admin listing with order counts
pub async fn list_with_order_counts(pool: &PgPool) -> Result<Vec<ProductListItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT p.id, p.name, p.price_in_cents, p.is_available_for_purchase,
            (SELECT COUNT(*) FROM order_items oi WHERE oi.product_id = p.id) AS order_count
         FROM products p
         ORDER BY p.name",
    )
    .fetch_all(pool)
    .await
}

pub async fn create(pool: &PgPool, id: Uuid, input: &ProductInput) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO products (id, name, description, price_in_cents, image_path, is_available_for_purchase)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price_in_cents)
    .bind(&input.image_path)
    .bind(input.is_available_for_purchase)
    .execute(&mut *tx)
    .await?;
    replace_categories(&mut tx, id, &input.category_ids).await?;
    tx.commit().await
}

/// Returns false when the product does not exist
pub async fn update(pool: &PgPool, id: Uuid, input: &ProductInput) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE products SET name = $2, description = $3, price_in_cents = $4,
            image_path = $5, is_available_for_purchase = $6, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price_in_cents)
    .bind(&input.image_path)
    .bind(input.is_available_for_purchase)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    replace_categories(&mut tx, id, &input.category_ids).await?;
    tx.commit().await?;
    Ok(true)
}

async fn replace_categories(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    category_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO product_categories (product_id, category_id)
         SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(product_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_availability(
    pool: &PgPool,
    id: Uuid,
    available: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET is_available_for_purchase = $2, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(available)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteProduct {
    Deleted,
    HasOrders,
    NotFound,
}

/// Products that appear on any order cannot be deleted.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<DeleteProduct, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM products p WHERE p.id = $1
         AND NOT EXISTS (SELECT 1 FROM order_items oi WHERE oi.product_id = p.id)",
    )
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() > 0 {
        return Ok(DeleteProduct::Deleted);
    }
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(match exists {
        Some(_) => DeleteProduct::HasOrders,
        None => DeleteProduct::NotFound,
    })
}

/// (available, unavailable)
pub async fn availability_counts(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT
            COUNT(*) FILTER (WHERE is_available_for_purchase),
            COUNT(*) FILTER (WHERE NOT is_available_for_purchase)
         FROM products",
    )
    .fetch_one(pool)
    .await
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn create_category(pool: &PgPool, id: Uuid, name: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
