use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ticker-keyed cache row, created the first time a user references a ticker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub ai_summary: Option<String>,
    pub quality_score: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateStock {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    pub dividend_yield: Option<f64>,
}

/// Result of a stock analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub ticker: String,
    pub analysis: String,
    pub quality_score: Option<f64>,
    pub generated_at: DateTime<Utc>,
}
