use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DayPart, MarketReport};

pub async fn fetch_latest(pool: &PgPool) -> Result<Option<MarketReport>, sqlx::Error> {
    sqlx::query_as::<_, MarketReport>(
        "SELECT id, content, day_part, created_at
         FROM market_reports
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

pub async fn fetch_recent(pool: &PgPool, limit: i64) -> Result<Vec<MarketReport>, sqlx::Error> {
    sqlx::query_as::<_, MarketReport>(
        "SELECT id, content, day_part, created_at
         FROM market_reports
         ORDER BY created_at DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn insert(pool: &PgPool, content: &str, day_part: DayPart) -> Result<MarketReport, sqlx::Error> {
    sqlx::query_as::<_, MarketReport>(
        "INSERT INTO market_reports (id, content, day_part)
         VALUES ($1, $2, $3)
         RETURNING id, content, day_part, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(content)
    .bind(day_part.as_str())
    .fetch_one(pool)
    .await
}
