use sqlx::PgPool;
use uuid::Uuid;

use crate::db::watchlist_queries;
use crate::errors::AppError;
use crate::models::{RemovedItem, WatchlistEntryResponse, WatchlistItem};
use crate::services::market_data_service::{normalize_ticker, MarketDataService};
use crate::services::stock_service;

/// Watched tickers with cached stock data, refreshed with live quotes.
pub async fn list(
    pool: &PgPool,
    market: &MarketDataService,
    user_id: Uuid,
) -> Result<Vec<WatchlistEntryResponse>, AppError> {
    let entries = watchlist_queries::fetch_entries(pool, user_id).await?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let tickers: Vec<String> = entries.iter().map(|e| e.ticker.clone()).collect();
    let quotes = market.get_batch_prices(&tickers).await;

    Ok(entries
        .into_iter()
        .map(|mut entry| match quotes.get(&entry.ticker) {
            Some(quote) => {
                entry.current_price = Some(quote.price);
                WatchlistEntryResponse {
                    entry,
                    change: quote.change,
                    change_percent: quote.change_percent,
                }
            }
            None => WatchlistEntryResponse {
                entry,
                change: 0.0,
                change_percent: 0.0,
            },
        })
        .collect())
}

/// Adding a ticker that is already watched returns the existing row.
pub async fn add(
    pool: &PgPool,
    market: &MarketDataService,
    user_id: Uuid,
    ticker: &str,
) -> Result<WatchlistItem, AppError> {
    let ticker = normalize_ticker(ticker)?;
    stock_service::ensure_stock(pool, market, &ticker).await?;
    Ok(watchlist_queries::insert_or_get(pool, user_id, &ticker).await?)
}

pub async fn remove(pool: &PgPool, user_id: Uuid, ticker: &str) -> Result<RemovedItem, AppError> {
    let ticker = normalize_ticker(ticker)?;
    match watchlist_queries::delete(pool, user_id, &ticker).await? {
        0 => Err(AppError::NotFound("Item not found in watchlist".to_string())),
        _ => Ok(RemovedItem {
            message: "Item removed".to_string(),
            ticker,
        }),
    }
}
