use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ExchangeRate, NewsItem, PriceQuote, StockProfile};

/// Per-call timeout for every market data request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,

    #[error("operation not supported by this provider")]
    Unsupported,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Raw dividend payments plus the latest close, as a provider reports them.
#[derive(Debug, Clone)]
pub struct RawDividends {
    pub last_close: Option<f64>,
    /// Any order; normalized by the dividend service.
    pub payments: Vec<(NaiveDate, f64)>,
}

/// One upstream source of market data. Operations a source cannot serve
/// return `ProviderError::Unsupported` so the caller moves on to the next one.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn profile(&self, _ticker: &str) -> Result<StockProfile, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn price(&self, _ticker: &str) -> Result<PriceQuote, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn dividends(&self, _ticker: &str) -> Result<RawDividends, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    /// Company news when `ticker` is set, general market headlines otherwise.
    async fn news(&self, _ticker: Option<&str>, _limit: usize) -> Result<Vec<NewsItem>, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn exchange_rate(&self, _pair: &str) -> Result<ExchangeRate, ProviderError> {
        Err(ProviderError::Unsupported)
    }

    async fn batch_prices(
        &self,
        _tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, ProviderError> {
        Err(ProviderError::Unsupported)
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Maps a non-success HTTP status onto a provider error.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str, what: &str) -> ProviderError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        reqwest::StatusCode::NOT_FOUND => ProviderError::NotFound(what.to_string()),
        _ => ProviderError::BadResponse(format!("HTTP {} for {}: {}", status, what, truncate(body, 200))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_are_classified() {
        assert!(matches!(
            status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "", "AAPL"),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::NOT_FOUND, "", "AAPL"),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops", "AAPL"),
            ProviderError::BadResponse(_)
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("한국어입니다", 3), "한국어");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
