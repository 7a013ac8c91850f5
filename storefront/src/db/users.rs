use shared::models::{User, UserListItem};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert the buyer or return the existing row. `email` must already be
/// normalized.
pub async fn upsert(pool: &PgPool, email: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO users (id, email) VALUES ($1, $2)
         ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
         RETURNING id, email, name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .fetch_one(pool)
    .await
}

/// Admin listing with order statistics
pub async fn list(pool: &PgPool) -> Result<Vec<UserListItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT u.id, u.email,
            COUNT(o.id) AS order_count,
            COALESCE(SUM(o.price_paid_in_cents) FILTER (WHERE o.is_paid), 0)::BIGINT AS total_spent_in_cents,
            u.created_at
         FROM users u
         LEFT JOIN orders o ON o.user_id = u.id
         GROUP BY u.id
         ORDER BY u.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

/// Deletes the user and, by cascade, their orders
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
