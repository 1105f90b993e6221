use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use futures::future::join_all;
use serde::Deserialize;
use tracing::warn;

use crate::external::market_provider::{
    http_client, status_error, MarketDataProvider, ProviderError, RawDividends,
};
use crate::models::{ExchangeRate, PriceQuote, StockProfile};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Free, key-less chart endpoint; the secondary source in the chain.
pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self { client: http_client()? })
    }

    async fn chart(&self, symbol: &str, range: &str, interval: &str) -> Result<YahooResult, ProviderError> {
        let resp = self
            .client
            .get(format!("{CHART_URL}/{symbol}"))
            // Yahoo rejects requests without a browser-like agent
            .header("User-Agent", "Mozilla/5.0")
            .query(&[("range", range), ("interval", interval), ("events", "div")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body, symbol));
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        first_result(body, symbol)
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    events: Option<YahooEvents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: String,
    regular_market_price: Option<f64>,
    /// Close before the first bar of the requested range, not necessarily
    /// the prior session.
    chart_previous_close: Option<f64>,
    regular_market_previous_close: Option<f64>,
    previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
    full_exchange_name: Option<String>,
    exchange_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooEvents {
    #[serde(default)]
    dividends: HashMap<String, YahooDividend>,
}

#[derive(Debug, Deserialize)]
struct YahooDividend {
    amount: f64,
    date: i64,
}

fn first_result(body: YahooChartResponse, symbol: &str) -> Result<YahooResult, ProviderError> {
    if let Some(err) = body.chart.error {
        if !err.is_null() {
            return Err(ProviderError::NotFound(format!("{symbol}: {err}")));
        }
    }
    body.chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| ProviderError::BadResponse(format!("missing chart result for {symbol}")))
}

fn quote_from_meta(meta: &YahooMeta) -> Result<PriceQuote, ProviderError> {
    let price = meta
        .regular_market_price
        .ok_or_else(|| ProviderError::BadResponse(format!("no market price for {}", meta.symbol)))?;
    Ok(PriceQuote::from_prices(
        price,
        meta.regular_market_previous_close
            .or(meta.previous_close)
            .or(meta.chart_previous_close),
    ))
}

fn dividends_from_result(result: YahooResult) -> Result<RawDividends, ProviderError> {
    let mut payments = Vec::new();
    if let Some(events) = result.events {
        for dividend in events.dividends.into_values() {
            let date = DateTime::from_timestamp(dividend.date, 0)
                .ok_or_else(|| ProviderError::Parse("bad dividend timestamp".into()))?
                .date_naive();
            payments.push((date, dividend.amount));
        }
    }

    Ok(RawDividends {
        last_close: result.meta.regular_market_price,
        payments,
    })
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn profile(&self, ticker: &str) -> Result<StockProfile, ProviderError> {
        let result = self.chart(ticker, "1d", "1d").await?;
        let meta = result.meta;
        let name = meta
            .long_name
            .or(meta.short_name)
            .ok_or_else(|| ProviderError::NotFound(format!("no company name for {ticker}")))?;

        Ok(StockProfile {
            ticker: meta.symbol.to_uppercase(),
            name,
            sector: "Unknown".to_string(),
            description: String::new(),
            market_cap: None,
            exchange: meta.full_exchange_name.or(meta.exchange_name),
        })
    }

    async fn price(&self, ticker: &str) -> Result<PriceQuote, ProviderError> {
        // A one-day range keeps chartPreviousClose on the prior session
        let result = self.chart(ticker, "1d", "1d").await?;
        quote_from_meta(&result.meta)
    }

    async fn dividends(&self, ticker: &str) -> Result<RawDividends, ProviderError> {
        let result = self.chart(ticker, "6y", "1mo").await?;
        dividends_from_result(result)
    }

    async fn exchange_rate(&self, pair: &str) -> Result<ExchangeRate, ProviderError> {
        // usdkrw -> USDKRW=X
        let symbol = format!("{}=X", pair.to_uppercase());
        let result = self.chart(&symbol, "1d", "1d").await?;
        let quote = quote_from_meta(&result.meta)?;
        Ok(ExchangeRate {
            pair: pair.to_lowercase(),
            rate: quote.price,
        })
    }

    async fn batch_prices(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, ProviderError> {
        let results = join_all(tickers.iter().map(|t| self.price(t))).await;

        let mut quotes = HashMap::new();
        for (ticker, result) in tickers.iter().zip(results) {
            match result {
                Ok(quote) => {
                    quotes.insert(ticker.clone(), quote);
                }
                Err(e) => warn!("Yahoo batch quote failed for {}: {}", ticker, e),
            }
        }

        if quotes.is_empty() {
            return Err(ProviderError::NotFound("no Yahoo quotes in batch".into()));
        }
        Ok(quotes)
    }
}
