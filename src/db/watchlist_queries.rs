use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{WatchlistEntry, WatchlistItem};

pub async fn fetch_entries(pool: &PgPool, user_id: Uuid) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>(
        r#"
        SELECT w.id, w.ticker, w.created_at,
               s.name, s.sector, s.current_price, s.dividend_yield, s.quality_score
        FROM watchlist_items w
        LEFT JOIN stocks s ON s.ticker = w.ticker
        WHERE w.user_id = $1
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one(
    pool: &PgPool,
    user_id: Uuid,
    ticker: &str,
) -> Result<Option<WatchlistItem>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        "SELECT id, user_id, ticker, created_at
         FROM watchlist_items
         WHERE user_id = $1 AND ticker = $2",
    )
    .bind(user_id)
    .bind(ticker)
    .fetch_optional(pool)
    .await
}

/// Adds a ticker, returning the existing row when it is already watched.
pub async fn insert_or_get(
    pool: &PgPool,
    user_id: Uuid,
    ticker: &str,
) -> Result<WatchlistItem, sqlx::Error> {
    let inserted = sqlx::query_as::<_, WatchlistItem>(
        r#"
        INSERT INTO watchlist_items (id, user_id, ticker)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, ticker) DO NOTHING
        RETURNING id, user_id, ticker, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(ticker)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(item) => Ok(item),
        None => fetch_one(pool, user_id, ticker)
            .await?
            .ok_or(sqlx::Error::RowNotFound),
    }
}

pub async fn delete(pool: &PgPool, user_id: Uuid, ticker: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist_items WHERE user_id = $1 AND ticker = $2")
        .bind(user_id)
        .bind(ticker)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
