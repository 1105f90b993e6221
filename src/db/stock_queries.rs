use sqlx::PgPool;

use crate::models::{CreateStock, Stock};

pub async fn fetch_one(pool: &PgPool, ticker: &str) -> Result<Option<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(
        "SELECT ticker, name, sector, market_cap, current_price, dividend_yield,
                ai_summary, quality_score, updated_at
         FROM stocks
         WHERE ticker = $1",
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await
}

/// Inserts a stock row; a concurrent insert of the same ticker is ignored.
pub async fn insert(pool: &PgPool, input: CreateStock) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stocks (ticker, name, sector, market_cap, current_price, dividend_yield, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (ticker) DO NOTHING",
    )
    .bind(input.ticker)
    .bind(input.name)
    .bind(input.sector)
    .bind(input.market_cap)
    .bind(input.current_price)
    .bind(input.dividend_yield)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_price(pool: &PgPool, ticker: &str, price: f64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE stocks SET current_price = $2, updated_at = NOW() WHERE ticker = $1")
        .bind(ticker)
        .bind(price)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_analysis(
    pool: &PgPool,
    ticker: &str,
    summary: &str,
    quality_score: Option<f64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE stocks
         SET ai_summary = $2, quality_score = COALESCE($3, quality_score), updated_at = NOW()
         WHERE ticker = $1",
    )
    .bind(ticker)
    .bind(summary)
    .bind(quality_score)
    .execute(pool)
    .await?;
    Ok(())
}
