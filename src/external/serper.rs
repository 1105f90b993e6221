use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::external::market_provider::{http_client, status_error, MarketDataProvider, ProviderError};
use crate::models::NewsItem;

/// Google news search through Serper; the web-search fallback for news.
pub struct SerperProvider {
    api_key: String,
    client: reqwest::Client,
}

impl SerperProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key,
            client: http_client()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    news: Option<Vec<SerperNewsItem>>,
}

#[derive(Debug, Deserialize)]
struct SerperNewsItem {
    title: String,
    link: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    snippet: String,
}

/// Serper reports dates like "2 hours ago", "3 days ago" or "Mar 15, 2024".
fn parse_serper_date(date_str: &str) -> String {
    let now = Utc::now();
    let lower = date_str.to_lowercase();

    if lower.contains("ago") {
        let n = lower
            .split_whitespace()
            .find_map(|word| word.parse::<i64>().ok())
            .unwrap_or(0);
        let at = if lower.contains("minute") {
            now - Duration::minutes(n)
        } else if lower.contains("hour") {
            now - Duration::hours(n)
        } else if lower.contains("week") {
            now - Duration::weeks(n)
        } else {
            now - Duration::days(n)
        };
        return at.to_rfc3339();
    }

    if let Ok(day) = NaiveDate::parse_from_str(date_str, "%b %d, %Y") {
        return day.format("%Y-%m-%d").to_string();
    }

    warn!("Could not parse Serper date '{}', using current time", date_str);
    now.to_rfc3339()
}

#[async_trait]
impl MarketDataProvider for SerperProvider {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn news(&self, ticker: Option<&str>, limit: usize) -> Result<Vec<NewsItem>, ProviderError> {
        let query = match ticker {
            Some(t) => format!("{t} stock"),
            None => "US stock market today".to_string(),
        };
        info!("Fetching news from Serper for query: {}", query);

        let resp = self
            .client
            .post("https://google.serper.dev/news")
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query, "num": limit.min(100) }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body, &query));
        }

        let body: SerperResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let items: Vec<NewsItem> = body
            .news
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|n| NewsItem {
                published_date: parse_serper_date(&n.date),
                title: n.title,
                description: n.snippet,
                source: n.source,
                url: n.link,
            })
            .collect();

        if items.is_empty() {
            return Err(ProviderError::NotFound(format!("no news for '{query}'")));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_dates_become_iso_days() {
        assert_eq!(parse_serper_date("Mar 15, 2024"), "2024-03-15");
    }

    #[test]
    fn relative_dates_are_in_the_past() {
        let parsed = parse_serper_date("3 days ago");
        let at = chrono::DateTime::parse_from_rfc3339(&parsed).unwrap();
        let age = Utc::now() - at.with_timezone(&Utc);
        assert!(age >= Duration::days(3) - Duration::minutes(1));
        assert!(age < Duration::days(3) + Duration::minutes(1));
    }
}
