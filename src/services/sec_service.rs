use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::SecLink;

const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// One row of SEC's company_tickers.json, keyed by a running index.
#[derive(Debug, Deserialize)]
struct CompanyTicker {
    cik_str: u64,
    ticker: String,
}

fn parse_ticker_map(body: HashMap<String, CompanyTicker>) -> HashMap<String, u64> {
    body.into_values()
        .filter(|row| !row.ticker.is_empty() && row.cik_str > 0)
        .map(|row| (row.ticker.to_uppercase(), row.cik_str))
        .collect()
}

pub fn edgar_url(cik: u64) -> String {
    format!("https://www.sec.gov/edgar/browse/?CIK={}", cik)
}

/// Ticker to CIK lookups against SEC EDGAR. The ticker map is fetched on the
/// first lookup; a failed fetch leaves it empty and is retried next time.
#[derive(Clone)]
pub struct SecService {
    client: Client,
    user_agent: String,
    ciks: Arc<DashMap<String, u64>>,
    load_lock: Arc<Mutex<()>>,
}

impl SecService {
    pub fn new(user_agent: String) -> Self {
        Self {
            client: Client::new(),
            user_agent,
            ciks: Arc::new(DashMap::new()),
            load_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn fetch_ticker_map(&self) -> Result<HashMap<String, u64>, AppError> {
        info!("Fetching SEC ticker map...");
        let response = self
            .client
            .get(TICKERS_URL)
            // SEC requires a User-Agent with contact info
            .header("User-Agent", &self.user_agent)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AppError::External(format!("Failed to fetch SEC ticker map: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::External(format!(
                "SEC returned status: {}",
                response.status()
            )));
        }

        let body: HashMap<String, CompanyTicker> = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Failed to parse SEC ticker map: {}", e)))?;
        Ok(parse_ticker_map(body))
    }

    async fn ensure_loaded(&self) {
        if !self.ciks.is_empty() {
            return;
        }
        let _guard = self.load_lock.lock().await;
        // Another request may have finished loading while we waited
        if !self.ciks.is_empty() {
            return;
        }

        match self.fetch_ticker_map().await {
            Ok(map) => {
                info!("Loaded {} tickers from SEC.", map.len());
                for (ticker, cik) in map {
                    self.ciks.insert(ticker, cik);
                }
            }
            Err(e) => error!("Failed to load SEC ticker map: {}", e),
        }
    }

    pub async fn get_cik(&self, ticker: &str) -> Option<u64> {
        self.ensure_loaded().await;
        self.ciks.get(&ticker.to_uppercase()).map(|entry| *entry.value())
    }

    pub async fn get_edgar_url(&self, ticker: &str) -> Option<String> {
        self.get_cik(ticker).await.map(edgar_url)
    }

    pub async fn lookup(&self, ticker: &str) -> SecLink {
        let cik = self.get_cik(ticker).await;
        SecLink {
            ticker: ticker.to_uppercase(),
            cik,
            edgar_url: cik.map(edgar_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_company_tickers_file() {
        let body: HashMap<String, CompanyTicker> = serde_json::from_str(
            r#"{
                "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
                "1": {"cik_str": 789019, "ticker": "msft", "title": "MICROSOFT CORP"}
            }"#,
        )
        .unwrap();
        let map = parse_ticker_map(body);
        assert_eq!(map.get("AAPL"), Some(&320193));
        assert_eq!(map.get("MSFT"), Some(&789019));
    }

    #[test]
    fn builds_edgar_browse_url() {
        assert_eq!(edgar_url(320193), "https://www.sec.gov/edgar/browse/?CIK=320193");
    }

    #[tokio::test]
    async fn preloaded_map_answers_without_fetching() {
        let service = SecService::new("test-agent".to_string());
        service.ciks.insert("AAPL".to_string(), 320193);

        let link = service.lookup("aapl").await;
        assert_eq!(link.cik, Some(320193));
        assert_eq!(link.edgar_url.as_deref(), Some("https://www.sec.gov/edgar/browse/?CIK=320193"));
    }
}
