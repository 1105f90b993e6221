use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::MarketDataConfig;
use crate::errors::AppError;
use crate::external::market_provider::{MarketDataProvider, ProviderError};
use crate::external::mock;
use crate::external::serper::SerperProvider;
use crate::external::tiingo::TiingoProvider;
use crate::external::yahoo::YahooProvider;
use crate::models::{
    DividendInfo, ExchangeRate, FullStockData, MarketBriefData, MarketDashboard, NewsItem,
    PriceQuote, StockProfile,
};
use crate::services::dividend_service;

/// Index ETFs quoted in the market briefing and dashboard.
pub const MARKET_INDICES: [&str; 4] = ["SPY", "QQQ", "DIA", "IWM"];

/// Headlines fed into the market briefing.
pub const BRIEFING_HEADLINES: usize = 8;

/// Trims and upper-cases a ticker from a request path or body, rejecting
/// anything that cannot be a listed symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let pattern = Regex::new(r"^[A-Z0-9.\-]{1,10}$").map_err(|e| AppError::Internal(e.to_string()))?;

    let ticker = raw.trim().to_uppercase();
    if !pattern.is_match(&ticker) {
        return Err(AppError::Validation(format!("Invalid ticker symbol: '{}'", raw.trim())));
    }
    Ok(ticker)
}

fn log_failure(provider: &dyn MarketDataProvider, op: &str, subject: &str, err: &ProviderError) {
    match err {
        ProviderError::Unsupported => debug!("{} does not serve {}", provider.name(), op),
        other => warn!("{} {} failed for {}: {}", provider.name(), op, subject, other),
    }
}

/// Walks the configured providers in order for every operation. The first
/// success wins; when every provider fails the static mock payload is served,
/// so callers never see an error.
#[derive(Clone)]
pub struct MarketDataService {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl MarketDataService {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    /// Tiingo when a key is configured, then Yahoo, then Serper (news only) when keyed.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self, ProviderError> {
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

        match &config.tiingo_api_key {
            Some(key) => providers.push(Arc::new(TiingoProvider::new(key.clone())?)),
            None => warn!("TIINGO_API_KEY not set, skipping Tiingo"),
        }
        providers.push(Arc::new(YahooProvider::new()?));
        match &config.serper_api_key {
            Some(key) => providers.push(Arc::new(SerperProvider::new(key.clone())?)),
            None => warn!("SERPER_API_KEY not set, news falls back to mock data"),
        }

        info!(
            "Market data chain: {}",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(" -> ")
        );
        Ok(Self::new(providers))
    }

    pub async fn get_profile(&self, ticker: &str) -> StockProfile {
        let ticker = ticker.trim().to_uppercase();
        for provider in &self.providers {
            match provider.profile(&ticker).await {
                Ok(profile) => return profile,
                Err(e) => log_failure(provider.as_ref(), "profile", &ticker, &e),
            }
        }
        info!("Serving mock profile for {}", ticker);
        mock::profile(&ticker)
    }

    pub async fn get_price(&self, ticker: &str) -> PriceQuote {
        let ticker = ticker.trim().to_uppercase();
        for provider in &self.providers {
            match provider.price(&ticker).await {
                Ok(quote) => return quote,
                Err(e) => log_failure(provider.as_ref(), "price", &ticker, &e),
            }
        }
        info!("Serving mock price for {}", ticker);
        mock::price(&ticker)
    }

    pub async fn get_dividends(&self, ticker: &str) -> DividendInfo {
        let ticker = ticker.trim().to_uppercase();
        for provider in &self.providers {
            match provider.dividends(&ticker).await {
                Ok(raw) => return dividend_service::summarize(raw, Utc::now().date_naive()),
                Err(e) => log_failure(provider.as_ref(), "dividends", &ticker, &e),
            }
        }
        info!("Serving mock dividends for {}", ticker);
        mock::dividends(&ticker)
    }

    pub async fn get_news(&self, ticker: &str, limit: usize) -> Vec<NewsItem> {
        let ticker = ticker.trim().to_uppercase();
        self.news_chain(Some(&ticker), limit).await
    }

    /// General market headlines.
    pub async fn get_market_news(&self, limit: usize) -> Vec<NewsItem> {
        self.news_chain(None, limit).await
    }

    async fn news_chain(&self, ticker: Option<&str>, limit: usize) -> Vec<NewsItem> {
        let subject = ticker.unwrap_or("market");
        for provider in &self.providers {
            match provider.news(ticker, limit).await {
                Ok(items) => return items.into_iter().take(limit).collect(),
                Err(e) => log_failure(provider.as_ref(), "news", subject, &e),
            }
        }
        mock::news(ticker)
    }

    pub async fn get_exchange_rate(&self, pair: &str) -> ExchangeRate {
        let pair = pair.trim().to_lowercase();
        for provider in &self.providers {
            match provider.exchange_rate(&pair).await {
                Ok(rate) => return rate,
                Err(e) => log_failure(provider.as_ref(), "exchange rate", &pair, &e),
            }
        }
        mock::exchange_rate(&pair)
    }

    /// Quotes for several tickers at once. A provider's partial answer still
    /// wins; tickers it could not price are simply absent.
    pub async fn get_batch_prices(&self, tickers: &[String]) -> HashMap<String, PriceQuote> {
        let mut wanted: Vec<String> = tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return HashMap::new();
        }

        for provider in &self.providers {
            match provider.batch_prices(&wanted).await {
                Ok(quotes) => return quotes,
                Err(e) => log_failure(provider.as_ref(), "batch prices", &wanted.join(","), &e),
            }
        }
        wanted
            .into_iter()
            .map(|t| {
                let quote = mock::price(&t);
                (t, quote)
            })
            .collect()
    }

    pub async fn get_full(&self, ticker: &str) -> FullStockData {
        let (profile, price, dividends) = tokio::join!(
            self.get_profile(ticker),
            self.get_price(ticker),
            self.get_dividends(ticker),
        );
        FullStockData {
            profile,
            price,
            dividends,
        }
    }

    async fn index_quotes(&self) -> BTreeMap<String, PriceQuote> {
        let symbols: Vec<String> = MARKET_INDICES.iter().map(|s| s.to_string()).collect();
        self.get_batch_prices(&symbols).await.into_iter().collect()
    }

    pub async fn get_market_brief_data(&self) -> MarketBriefData {
        let (indices, news) = tokio::join!(
            self.index_quotes(),
            self.get_market_news(BRIEFING_HEADLINES),
        );
        MarketBriefData { indices, news }
    }

    pub async fn get_dashboard(&self) -> MarketDashboard {
        let (indices, exchange_rate, headlines) = tokio::join!(
            self.index_quotes(),
            self.get_exchange_rate("usdkrw"),
            self.get_market_news(BRIEFING_HEADLINES),
        );
        MarketDashboard {
            indices,
            exchange_rate,
            headlines,
        }
    }
}
