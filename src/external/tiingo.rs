use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::external::market_provider::{
    http_client, status_error, MarketDataProvider, ProviderError, RawDividends,
};
use crate::models::{ExchangeRate, NewsItem, PriceQuote, StockProfile};

const BASE_URL: &str = "https://api.tiingo.com";

/// Paid quote API; the primary source in the chain.
pub struct TiingoProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TiingoProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, ProviderError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}{path}"))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Token {}", self.api_key))
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body, what));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoMeta {
    ticker: String,
    name: Option<String>,
    description: Option<String>,
    exchange_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoIexQuote {
    ticker: String,
    last: Option<f64>,
    tngo_last: Option<f64>,
    prev_close: Option<f64>,
}

impl TiingoIexQuote {
    fn to_quote(&self) -> Option<PriceQuote> {
        let price = self.last.or(self.tngo_last)?;
        Some(PriceQuote::from_prices(price, self.prev_close))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoDailyPrice {
    date: String,
    close: Option<f64>,
    #[serde(default)]
    div_cash: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoNews {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    published_date: String,
}

impl From<TiingoNews> for NewsItem {
    fn from(n: TiingoNews) -> Self {
        NewsItem {
            title: n.title,
            description: n.description,
            source: n.source,
            url: n.url,
            published_date: n.published_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TiingoFxTop {
    ticker: String,
    mid_price: Option<f64>,
}

fn parse_dividends(rows: Vec<TiingoDailyPrice>) -> Result<RawDividends, ProviderError> {
    let last_close = rows.iter().rev().find_map(|r| r.close);

    let mut payments = Vec::new();
    for row in rows.into_iter().filter(|r| r.div_cash > 0.0) {
        let day = row.date.get(..10).unwrap_or(&row.date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|e| ProviderError::Parse(format!("bad date '{}': {}", row.date, e)))?;
        payments.push((date, row.div_cash));
    }

    Ok(RawDividends { last_close, payments })
}

#[async_trait]
impl MarketDataProvider for TiingoProvider {
    fn name(&self) -> &'static str {
        "tiingo"
    }

    async fn profile(&self, ticker: &str) -> Result<StockProfile, ProviderError> {
        let meta: TiingoMeta = self
            .get_json(&format!("/tiingo/daily/{ticker}"), &[], ticker)
            .await?;

        Ok(StockProfile {
            ticker: meta.ticker.to_uppercase(),
            name: meta.name.unwrap_or_else(|| ticker.to_string()),
            // Tiingo metadata carries no sector or market cap
            sector: "Unknown".to_string(),
            description: meta.description.unwrap_or_default(),
            market_cap: None,
            exchange: meta.exchange_code,
        })
    }

    async fn price(&self, ticker: &str) -> Result<PriceQuote, ProviderError> {
        let rows: Vec<TiingoIexQuote> = self.get_json(&format!("/iex/{ticker}"), &[], ticker).await?;
        rows.first()
            .and_then(TiingoIexQuote::to_quote)
            .ok_or_else(|| ProviderError::NotFound(format!("no IEX quote for {ticker}")))
    }

    async fn dividends(&self, ticker: &str) -> Result<RawDividends, ProviderError> {
        // Six years covers the five-year growth window plus a trailing year
        let start = (Utc::now().date_naive() - Duration::days(6 * 366)).format("%Y-%m-%d");
        let rows: Vec<TiingoDailyPrice> = self
            .get_json(
                &format!("/tiingo/daily/{ticker}/prices"),
                &[
                    ("startDate", start.to_string()),
                    ("columns", "date,close,divCash".to_string()),
                ],
                ticker,
            )
            .await?;

        debug!("Tiingo returned {} daily rows for {}", rows.len(), ticker);
        parse_dividends(rows)
    }

    async fn news(&self, ticker: Option<&str>, limit: usize) -> Result<Vec<NewsItem>, ProviderError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(t) = ticker {
            query.push(("tickers", t.to_lowercase()));
        }

        let rows: Vec<TiingoNews> = self
            .get_json("/tiingo/news", &query, ticker.unwrap_or("market news"))
            .await?;
        Ok(rows.into_iter().take(limit).map(NewsItem::from).collect())
    }

    async fn exchange_rate(&self, pair: &str) -> Result<ExchangeRate, ProviderError> {
        let rows: Vec<TiingoFxTop> = self
            .get_json("/tiingo/fx/top", &[("tickers", pair.to_lowercase())], pair)
            .await?;

        rows.into_iter()
            .find_map(|r| r.mid_price.map(|rate| ExchangeRate { pair: r.ticker, rate }))
            .ok_or_else(|| ProviderError::NotFound(format!("no FX quote for {pair}")))
    }

    async fn batch_prices(
        &self,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceQuote>, ProviderError> {
        let joined = tickers.join(",");
        let rows: Vec<TiingoIexQuote> = self
            .get_json("/iex/", &[("tickers", joined.clone())], &joined)
            .await?;

        let quotes: HashMap<String, PriceQuote> = rows
            .iter()
            .filter_map(|row| row.to_quote().map(|q| (row.ticker.to_uppercase(), q)))
            .collect();

        if quotes.is_empty() {
            return Err(ProviderError::NotFound(format!("no IEX quotes for {joined}")));
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iex_quote_prefers_last_then_tiingo_last() {
        let rows: Vec<TiingoIexQuote> = serde_json::from_str(
            r#"[
                {"ticker":"AAPL","last":190.0,"tngoLast":189.0,"prevClose":180.0},
                {"ticker":"MSFT","last":null,"tngoLast":400.0,"prevClose":null},
                {"ticker":"NONE","last":null,"tngoLast":null,"prevClose":10.0}
            ]"#,
        )
        .unwrap();

        let aapl = rows[0].to_quote().unwrap();
        assert_eq!(aapl.price, 190.0);
        assert!((aapl.change - 10.0).abs() < 1e-9);

        let msft = rows[1].to_quote().unwrap();
        assert_eq!(msft.price, 400.0);
        assert_eq!(msft.change, 0.0);

        assert!(rows[2].to_quote().is_none());
    }

    #[test]
    fn dividends_keep_only_cash_rows() {
        let rows: Vec<TiingoDailyPrice> = serde_json::from_str(
            r#"[
                {"date":"2024-01-12T00:00:00.000Z","close":185.0,"divCash":0.0},
                {"date":"2024-02-09T00:00:00.000Z","close":188.0,"divCash":0.24},
                {"date":"2024-02-12T00:00:00.000Z","close":187.5,"divCash":0.0}
            ]"#,
        )
        .unwrap();

        let raw = parse_dividends(rows).unwrap();
        assert_eq!(raw.last_close, Some(187.5));
        assert_eq!(
            raw.payments,
            vec![(NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(), 0.24)]
        );
    }

    #[test]
    fn news_rows_tolerate_missing_fields() {
        let rows: Vec<TiingoNews> = serde_json::from_str(
            r#"[{"title":"Apple beats","publishedDate":"2024-03-01T12:00:00Z","source":"reuters.com"}]"#,
        )
        .unwrap();
        let item: NewsItem = rows.into_iter().next().unwrap().into();
        assert_eq!(item.title, "Apple beats");
        assert_eq!(item.description, "");
        assert_eq!(item.published_day(), "2024-03-01");
    }
}
