use shared::models::{
    NewOrder, Order, OrderHistoryEntry, OrderLine, OrderListItem, PaymentReceipt,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{MarkPaid, PaidOrder, Settlement, SinglePurchase, SinglePurchaseSlot};

const ORDER_COLUMNS: &str = "id, user_id, discount_code_id, product_id, price_paid_in_cents,
    is_paid, receipt_url, invoice_url, invoice_pdf_url, payment_reference, paid_at, created_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_lines(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderLine>, sqlx::Error> {
    sqlx::query_as(
        "SELECT order_id, product_id, quantity, price_paid_in_cents
         FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn has_paid_purchase(
    pool: &PgPool,
    email: &str,
    product_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (
            SELECT 1 FROM orders o JOIN users u ON u.id = o.user_id
            WHERE u.email = $1 AND o.is_paid = true
              AND (o.product_id = $2 OR EXISTS (
                  SELECT 1 FROM order_items oi
                  WHERE oi.order_id = o.id AND oi.product_id = $2
              ))
         )",
    )
    .bind(email)
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Insert the buyer's single-product order, or refresh the unpaid one.
///
/// The partial unique index on `(user_id, product_id)` makes this the one
/// place where a double purchase is decided: a paid row is never updated, so
/// no id comes back.
pub async fn open_single_purchase(
    pool: &PgPool,
    purchase: &SinglePurchase,
) -> Result<SinglePurchaseSlot, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let row: Option<(Uuid,)> = sqlx::query_as(
        "INSERT INTO orders (id, user_id, product_id, discount_code_id, price_paid_in_cents, is_paid)
         VALUES ($1, $2, $3, $4, $5, false)
         ON CONFLICT (user_id, product_id) WHERE product_id IS NOT NULL
         DO UPDATE SET discount_code_id = EXCLUDED.discount_code_id,
                       price_paid_in_cents = EXCLUDED.price_paid_in_cents
         WHERE orders.is_paid = false
         RETURNING id",
    )
    .bind(purchase.order_id)
    .bind(purchase.user_id)
    .bind(purchase.product_id)
    .bind(purchase.discount_code_id)
    .bind(purchase.price_paid_in_cents)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((order_id,)) = row else {
        return Ok(SinglePurchaseSlot::AlreadyPaid);
    };

    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity, price_paid_in_cents)
         VALUES ($1, $2, 1, $3)
         ON CONFLICT (order_id, product_id) DO UPDATE SET price_paid_in_cents = EXCLUDED.price_paid_in_cents",
    )
    .bind(order_id)
    .bind(purchase.product_id)
    .bind(purchase.price_paid_in_cents)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(SinglePurchaseSlot::Open(order_id))
}

pub async fn create(pool: &PgPool, order: &NewOrder) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, user_id, discount_code_id, price_paid_in_cents, is_paid)
         VALUES ($1, $2, $3, $4, false)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.discount_code_id)
    .bind(order.price_paid_in_cents)
    .execute(&mut *tx)
    .await?;

    for line in &order.lines {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price_paid_in_cents)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.price_paid_in_cents)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn set_payment_reference(
    pool: &PgPool,
    order_id: Uuid,
    reference: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
        .bind(order_id)
        .bind(reference)
        .execute(pool)
        .await?;
    Ok(())
}

/// Finalize an order in one transaction.
///
/// The conditional update only matches an unpaid row, so a redelivered event
/// finds nothing to transition and the `uses` increment is skipped. With a
/// settlement the row takes the amount and code that were actually charged;
/// a code deleted since then settles as none.
pub async fn mark_paid(
    pool: &PgPool,
    order_id: Uuid,
    receipt: &PaymentReceipt,
    settlement: Option<&Settlement>,
) -> Result<MarkPaid, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let paid: Option<Order> = sqlx::query_as(&format!(
        "UPDATE orders SET is_paid = true, paid_at = now(),
            receipt_url = $2, invoice_url = $3, invoice_pdf_url = $4,
            price_paid_in_cents = CASE WHEN $5 THEN $6 ELSE price_paid_in_cents END,
            discount_code_id = CASE WHEN $5
                THEN (SELECT id FROM discount_codes WHERE id = $7)
                ELSE discount_code_id END
         WHERE id = $1 AND is_paid = false
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(&receipt.receipt_url)
    .bind(&receipt.invoice_url)
    .bind(&receipt.invoice_pdf_url)
    .bind(settlement.is_some())
    .bind(settlement.map(|s| s.amount_in_cents))
    .bind(settlement.and_then(|s| s.discount_code_id))
    .fetch_optional(&mut *tx)
    .await?;

    let Some(order) = paid else {
        let exists: Option<(bool,)> = sqlx::query_as("SELECT is_paid FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.rollback().await?;
        return Ok(match exists {
            Some(_) => MarkPaid::AlreadyPaid,
            None => MarkPaid::NotFound,
        });
    };

    // Single-product orders carry one line priced like the order
    if settlement.is_some() && order.product_id.is_some() {
        sqlx::query("UPDATE order_items SET price_paid_in_cents = $2 WHERE order_id = $1")
            .bind(order.id)
            .bind(order.price_paid_in_cents)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(code_id) = order.discount_code_id {
        sqlx::query("UPDATE discount_codes SET uses = uses + 1 WHERE id = $1")
            .bind(code_id)
            .execute(&mut *tx)
            .await?;
    }

    let (email,): (String,) = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(order.user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(MarkPaid::Transitioned(PaidOrder { order, email }))
}

/// Admin listing, newest first
pub async fn list(pool: &PgPool) -> Result<Vec<OrderListItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT o.id, u.email, o.price_paid_in_cents, o.is_paid, d.code AS discount_code, o.created_at
         FROM orders o
         JOIN users u ON u.id = o.user_id
         LEFT JOIN discount_codes d ON d.id = o.discount_code_id
         ORDER BY o.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Paid orders for the order history email
pub async fn paid_history(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<OrderHistoryEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT o.id, o.price_paid_in_cents, o.created_at, o.receipt_url, o.invoice_url
         FROM orders o JOIN users u ON u.id = o.user_id
         WHERE u.email = $1 AND o.is_paid = true
         ORDER BY o.created_at DESC",
    )
    .bind(email)
    .fetch_all(pool)
    .await
}

/// (paid order count, paid total in cents)
pub async fn sales_totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(price_paid_in_cents), 0)::BIGINT
         FROM orders WHERE is_paid = true",
    )
    .fetch_one(pool)
    .await
}
