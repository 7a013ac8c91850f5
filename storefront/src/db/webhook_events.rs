use sqlx::PgPool;

pub async fn is_processed(pool: &PgPool, event_id: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM processed_webhook_events WHERE event_id = $1)")
            .bind(event_id)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn record(pool: &PgPool, event_id: &str, event_type: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type)
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .execute(pool)
    .await?;
    Ok(())
}
