use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    DividendInfo, ExchangeRate, FullStockData, NewsItem, PriceQuote, SecLink, StockAnalysis,
    StockProfile,
};
use crate::routes::auth::CurrentUser;
use crate::services::market_data_service::normalize_ticker;
use crate::services::stock_service;
use crate::state::AppState;

const DEFAULT_NEWS_LIMIT: usize = 10;
const MAX_NEWS_LIMIT: usize = 50;
const MAX_BATCH_TICKERS: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/batch", get(get_batch_prices))
        .route("/fx", get(get_exchange_rate))
        .route("/:ticker/profile", get(get_profile))
        .route("/:ticker/price", get(get_price))
        .route("/:ticker/dividends", get(get_dividends))
        .route("/:ticker/news", get(get_news))
        .route("/:ticker/full", get(get_full))
        .route("/:ticker/sec", get(get_sec_link))
        .route("/:ticker/analysis", post(analyze))
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BatchParams {
    tickers: String,
}

#[derive(Debug, Deserialize)]
struct FxParams {
    pair: Option<String>,
}

async fn get_profile(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StockProfile>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("GET /stocks/{}/profile", ticker);
    Ok(Json(state.market.get_profile(&ticker).await))
}

async fn get_price(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PriceQuote>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("GET /stocks/{}/price", ticker);
    Ok(Json(state.market.get_price(&ticker).await))
}

async fn get_dividends(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DividendInfo>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("GET /stocks/{}/dividends", ticker);
    Ok(Json(state.market.get_dividends(&ticker).await))
}

async fn get_news(
    Path(ticker): Path<String>,
    Query(params): Query<NewsParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsItem>>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    let limit = params.limit.unwrap_or(DEFAULT_NEWS_LIMIT).clamp(1, MAX_NEWS_LIMIT);
    info!("GET /stocks/{}/news - limit {}", ticker, limit);
    Ok(Json(state.market.get_news(&ticker, limit).await))
}

async fn get_full(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FullStockData>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("GET /stocks/{}/full", ticker);
    Ok(Json(state.market.get_full(&ticker).await))
}

async fn get_sec_link(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SecLink>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("GET /stocks/{}/sec", ticker);
    Ok(Json(state.sec.lookup(&ticker).await))
}

async fn analyze(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StockAnalysis>, AppError> {
    let ticker = normalize_ticker(&ticker)?;
    info!("POST /stocks/{}/analysis - requested by {}", ticker, user.username);

    let analysis = stock_service::analyze(
        &state.pool,
        &state.market,
        &state.ai,
        &ticker,
        &user.prompt_profile(),
    )
    .await
    .map_err(|e| {
        error!("Failed to store analysis for {}: {}", ticker, e);
        e
    })?;
    Ok(Json(analysis))
}

async fn get_batch_prices(
    Query(params): Query<BatchParams>,
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, PriceQuote>>, AppError> {
    let tickers = params
        .tickers
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(normalize_ticker)
        .collect::<Result<Vec<_>, _>>()?;

    if tickers.is_empty() {
        return Err(AppError::Validation("At least one ticker is required".into()));
    }
    if tickers.len() > MAX_BATCH_TICKERS {
        return Err(AppError::Validation(format!(
            "At most {} tickers per request",
            MAX_BATCH_TICKERS
        )));
    }

    info!("GET /stocks/batch - {} tickers", tickers.len());
    Ok(Json(state.market.get_batch_prices(&tickers).await))
}

async fn get_exchange_rate(
    Query(params): Query<FxParams>,
    State(state): State<AppState>,
) -> Result<Json<ExchangeRate>, AppError> {
    let pair = params.pair.unwrap_or_else(|| "usdkrw".to_string()).to_lowercase();
    if pair.len() != 6 || !pair.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!("Invalid currency pair: '{}'", pair)));
    }
    info!("GET /stocks/fx - {}", pair);
    Ok(Json(state.market.get_exchange_rate(&pair).await))
}
