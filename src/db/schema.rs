use sqlx::PgPool;
use tracing::{info, warn};

/// Base tables, as shipped in the first release.
const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        risk_tolerance TEXT NOT NULL DEFAULT 'medium',
        preferred_sectors JSONB NOT NULL DEFAULT '[]'::jsonb,
        avoided_sectors JSONB NOT NULL DEFAULT '[]'::jsonb
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stocks (
        ticker TEXT PRIMARY KEY,
        name TEXT,
        sector TEXT,
        market_cap DOUBLE PRECISION,
        current_price DOUBLE PRECISION,
        dividend_yield DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS portfolio_items (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        ticker TEXT NOT NULL REFERENCES stocks(ticker),
        shares DOUBLE PRECISION NOT NULL,
        average_cost DOUBLE PRECISION NOT NULL,
        UNIQUE (user_id, ticker)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS watchlist_items (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        ticker TEXT NOT NULL REFERENCES stocks(ticker),
        UNIQUE (user_id, ticker)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS market_reports (
        id UUID PRIMARY KEY,
        content TEXT NOT NULL,
        day_part TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Columns added after the first release. Older databases are patched in place at startup.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("users", "email", "TEXT UNIQUE"),
    ("users", "hashed_password", "TEXT"),
    ("users", "google_sub", "TEXT UNIQUE"),
    ("users", "profile_picture", "TEXT"),
    ("users", "investment_profile", "JSONB NOT NULL DEFAULT '{}'::jsonb"),
    ("users", "created_at", "TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
    ("stocks", "ai_summary", "TEXT"),
    ("stocks", "quality_score", "DOUBLE PRECISION"),
    ("stocks", "updated_at", "TIMESTAMPTZ"),
    ("watchlist_items", "created_at", "TIMESTAMPTZ NOT NULL DEFAULT NOW()"),
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_portfolio_items_user ON portfolio_items(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_watchlist_items_user ON watchlist_items(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_market_reports_created ON market_reports(created_at DESC)",
];

pub(crate) fn add_column_sql(table: &str, column: &str, definition: &str) -> String {
    format!("ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {column} {definition}")
}

/// Creates missing tables, then adds any column an older schema lacks.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for &statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }

    let mut patched = 0;
    for &(table, column, definition) in ADDED_COLUMNS {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_name = $1 AND column_name = $2
            )
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_one(pool)
        .await?;

        if exists {
            continue;
        }

        warn!("🩹 Column {}.{} missing, adding it", table, column);
        sqlx::query(&add_column_sql(table, column, definition))
            .execute(pool)
            .await?;
        patched += 1;
    }

    for &statement in CREATE_INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("✅ Database schema ready ({} column(s) patched)", patched);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_column_statement_is_idempotent_sql() {
        assert_eq!(
            add_column_sql("users", "email", "TEXT UNIQUE"),
            "ALTER TABLE users ADD COLUMN IF NOT EXISTS email TEXT UNIQUE"
        );
    }

    #[test]
    fn every_added_column_targets_a_created_table() {
        for (table, _, _) in ADDED_COLUMNS {
            let created = CREATE_TABLES
                .iter()
                .any(|sql| sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")));
            assert!(created, "{table} is patched but never created");
        }
    }
}
