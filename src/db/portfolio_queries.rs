use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::PortfolioItem;

pub async fn fetch_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<PortfolioItem>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioItem>(
        "SELECT id, user_id, ticker, shares, average_cost
         FROM portfolio_items
         WHERE user_id = $1
         ORDER BY ticker ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Locks the caller's row for `ticker` until the surrounding transaction ends.
pub async fn fetch_one_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    ticker: &str,
) -> Result<Option<PortfolioItem>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioItem>(
        "SELECT id, user_id, ticker, shares, average_cost
         FROM portfolio_items
         WHERE user_id = $1 AND ticker = $2
         FOR UPDATE",
    )
    .bind(user_id)
    .bind(ticker)
    .fetch_optional(conn)
    .await
}

/// Inserts a new position. Returns `None` when a row for the same
/// `(user_id, ticker)` already exists, e.g. from a concurrent first buy.
pub async fn insert_if_absent(
    conn: &mut PgConnection,
    input: PortfolioItem,
) -> Result<Option<PortfolioItem>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioItem>(
        "INSERT INTO portfolio_items (id, user_id, ticker, shares, average_cost)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, ticker) DO NOTHING
         RETURNING id, user_id, ticker, shares, average_cost",
    )
    .bind(input.id)
    .bind(input.user_id)
    .bind(input.ticker)
    .bind(input.shares)
    .bind(input.average_cost)
    .fetch_optional(conn)
    .await
}

pub async fn update_position(
    conn: &mut PgConnection,
    id: Uuid,
    shares: f64,
    average_cost: f64,
) -> Result<PortfolioItem, sqlx::Error> {
    sqlx::query_as::<_, PortfolioItem>(
        "UPDATE portfolio_items
         SET shares = $2, average_cost = $3
         WHERE id = $1
         RETURNING id, user_id, ticker, shares, average_cost",
    )
    .bind(id)
    .bind(shares)
    .bind(average_cost)
    .fetch_one(conn)
    .await
}

pub async fn delete(pool: &PgPool, user_id: Uuid, ticker: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portfolio_items WHERE user_id = $1 AND ticker = $2")
        .bind(user_id)
        .bind(ticker)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
