use chrono::{DateTime, Utc};
use shared::models::{DiscountCode, DiscountCodeInput, DiscountCodeStatus};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::BoxError;
use crate::pricing::parse_discount_type;
use crate::store::DeleteDiscountCode;

const CODE_COLUMNS: &str = "d.id, d.code, d.discount_type, d.discount_amount, d.all_products,
    ARRAY(SELECT x.product_id FROM discount_code_products x WHERE x.discount_code_id = d.id) AS product_ids,
    ARRAY(SELECT x.category_id FROM discount_code_categories x WHERE x.discount_code_id = d.id) AS category_ids,
    d.usage_limit, d.uses, d.expires_at, d.is_active, d.created_at, d.stripe_coupon_id";

#[derive(sqlx::FromRow)]
struct DiscountCodeRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_amount: i64,
    all_products: bool,
    product_ids: Vec<Uuid>,
    category_ids: Vec<Uuid>,
    usage_limit: Option<i64>,
    uses: i64,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    stripe_coupon_id: Option<String>,
}

impl DiscountCodeRow {
    /// Unknown stored discount types surface as an integrity error.
    fn into_model(self) -> Result<DiscountCode, BoxError> {
        let discount_type = parse_discount_type(&self.discount_type).inspect_err(|e| {
            tracing::error!(code_id = %self.id, code = %self.code, error = %e, "Corrupt discount code row");
        })?;
        Ok(DiscountCode {
            id: self.id,
            code: self.code,
            discount_type,
            discount_amount: self.discount_amount,
            all_products: self.all_products,
            product_ids: self.product_ids,
            category_ids: self.category_ids,
            limit: self.usage_limit,
            uses: self.uses,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
            stripe_coupon_id: self.stripe_coupon_id,
        })
    }
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<DiscountCode>, BoxError> {
    let row: Option<DiscountCodeRow> =
        sqlx::query_as(&format!("SELECT {CODE_COLUMNS} FROM discount_codes d WHERE d.code = $1"))
            .bind(code)
            .fetch_optional(pool)
            .await?;
    row.map(DiscountCodeRow::into_model).transpose()
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DiscountCode>, BoxError> {
    let row: Option<DiscountCodeRow> =
        sqlx::query_as(&format!("SELECT {CODE_COLUMNS} FROM discount_codes d WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(DiscountCodeRow::into_model).transpose()
}

/// Admin listing. `Active` means usable right now; `Expired` is everything else.
pub async fn list(
    pool: &PgPool,
    status: Option<DiscountCodeStatus>,
) -> Result<Vec<DiscountCode>, BoxError> {
    let usable = "d.is_active = true
        AND (d.usage_limit IS NULL OR d.uses < d.usage_limit)
        AND (d.expires_at IS NULL OR d.expires_at > now())";
    let filter = match status {
        None => String::new(),
        Some(DiscountCodeStatus::Active) => format!("WHERE {usable}"),
        Some(DiscountCodeStatus::Expired) => format!("WHERE NOT ({usable})"),
    };
    let rows: Vec<DiscountCodeRow> = sqlx::query_as(&format!(
        "SELECT {CODE_COLUMNS} FROM discount_codes d {filter} ORDER BY d.created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(DiscountCodeRow::into_model).collect()
}

/// Returns false when the code string is already taken
pub async fn create(pool: &PgPool, id: Uuid, input: &DiscountCodeInput) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "INSERT INTO discount_codes
            (id, code, discount_type, discount_amount, all_products, usage_limit, expires_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (code) DO NOTHING",
    )
    .bind(id)
    .bind(&input.code)
    .bind(input.discount_type.as_db())
    .bind(input.discount_amount)
    .bind(input.all_products)
    .bind(input.limit)
    .bind(input.expires_at)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    replace_targets(&mut tx, id, input).await?;
    tx.commit().await?;
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDiscountCode {
    Updated,
    CodeTaken,
    NotFound,
}

/// Replace the definition of a code. `uses` is preserved.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    input: &DiscountCodeInput,
) -> Result<UpdateDiscountCode, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE discount_codes SET code = $2, discount_type = $3, discount_amount = $4,
            all_products = $5, usage_limit = $6, expires_at = $7
         WHERE id = $1",
    )
    .bind(id)
    .bind(&input.code)
    .bind(input.discount_type.as_db())
    .bind(input.discount_amount)
    .bind(input.all_products)
    .bind(input.limit)
    .bind(input.expires_at)
    .execute(&mut *tx)
    .await;
    let result = match result {
        Err(e) if is_unique_violation(&e) => return Ok(UpdateDiscountCode::CodeTaken),
        other => other?,
    };
    if result.rows_affected() == 0 {
        return Ok(UpdateDiscountCode::NotFound);
    }
    replace_targets(&mut tx, id, input).await?;
    tx.commit().await?;
    Ok(UpdateDiscountCode::Updated)
}

/// The `code` column is unique; a rename onto a taken code fails here
/// rather than in a racy pre-check.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

async fn replace_targets(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    input: &DiscountCodeInput,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM discount_code_products WHERE discount_code_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM discount_code_categories WHERE discount_code_id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO discount_code_products (discount_code_id, product_id)
         SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(&input.product_ids)
    .execute(&mut **tx)
    .await?;
    sqlx::query(
        "INSERT INTO discount_code_categories (discount_code_id, category_id)
         SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(&input.category_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Flip `is_active`; returns the new value, or None if the code is unknown
pub async fn toggle_active(pool: &PgPool, id: Uuid) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(bool,)> = sqlx::query_as(
        "UPDATE discount_codes SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

pub async fn set_stripe_coupon_id(
    pool: &PgPool,
    id: Uuid,
    coupon_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE discount_codes SET stripe_coupon_id = $2 WHERE id = $1")
        .bind(id)
        .bind(coupon_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Codes that have been redeemed, or that an unpaid order still references,
/// cannot be deleted.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<DeleteDiscountCode, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let deleted: Option<(Option<String>,)> = sqlx::query_as(
        "DELETE FROM discount_codes d
         WHERE d.id = $1 AND d.uses = 0
           AND NOT EXISTS (
               SELECT 1 FROM orders o WHERE o.discount_code_id = d.id AND o.is_paid = false
           )
         RETURNING d.stripe_coupon_id",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some((coupon_id,)) = deleted {
        tx.commit().await?;
        return Ok(DeleteDiscountCode::Deleted(coupon_id));
    }
    let uses: Option<(i64,)> = sqlx::query_as("SELECT uses FROM discount_codes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    tx.rollback().await?;
    Ok(match uses {
        Some((n,)) if n > 0 => DeleteDiscountCode::InUse,
        Some(_) => DeleteDiscountCode::Pending,
        None => DeleteDiscountCode::NotFound,
    })
}
