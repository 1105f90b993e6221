use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddWatchlistItem {
    pub ticker: String,
}

/// Watchlist row joined with the cached stock data.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub ticker: String,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub current_price: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub quality_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntryResponse {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub change: f64,
    pub change_percent: f64,
}
