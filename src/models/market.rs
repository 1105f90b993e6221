use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub description: String,
    pub market_cap: Option<f64>,
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub previous_close: Option<f64>,
}

impl PriceQuote {
    /// Builds a quote from the last price and the previous close.
    pub fn from_prices(price: f64, previous_close: Option<f64>) -> Self {
        match previous_close {
            Some(prev) if prev > 0.0 => {
                let change = price - prev;
                Self {
                    price,
                    change,
                    change_percent: change / prev * 100.0,
                    previous_close: Some(prev),
                }
            }
            _ => Self {
                price,
                change: 0.0,
                change_percent: 0.0,
                previous_close,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DividendFrequency {
    Monthly,
    Quarterly,
    #[serde(rename = "Semi-Annual")]
    SemiAnnual,
    Annual,
    None,
}

impl DividendFrequency {
    /// Calendar months between two consecutive payments.
    pub fn months(&self) -> Option<u32> {
        match self {
            DividendFrequency::Monthly => Some(1),
            DividendFrequency::Quarterly => Some(3),
            DividendFrequency::SemiAnnual => Some(6),
            DividendFrequency::Annual => Some(12),
            DividendFrequency::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendInfo {
    pub div_yield: f64,
    pub frequency: DividendFrequency,
    pub growth_rate_5y: f64,
    /// Newest payment first.
    pub history: Vec<DividendPayment>,
}

impl DividendInfo {
    pub fn empty() -> Self {
        Self {
            div_yield: 0.0,
            frequency: DividendFrequency::None,
            growth_rate_5y: 0.0,
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub source: String,
    pub url: String,
    /// ISO-8601 timestamp as reported by the source.
    pub published_date: String,
}

impl NewsItem {
    /// `YYYY-MM-DD` prefix of the publish timestamp, or the whole value when shorter.
    pub fn published_day(&self) -> &str {
        self.published_date
            .get(..10)
            .unwrap_or(self.published_date.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub pair: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullStockData {
    pub profile: StockProfile,
    pub price: PriceQuote,
    pub dividends: DividendInfo,
}

/// Raw inputs for the daily market briefing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketBriefData {
    pub indices: BTreeMap<String, PriceQuote>,
    pub news: Vec<NewsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDashboard {
    pub indices: BTreeMap<String, PriceQuote>,
    pub exchange_rate: ExchangeRate,
    pub headlines: Vec<NewsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecLink {
    pub ticker: String,
    pub cik: Option<u64>,
    pub edgar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_change_is_relative_to_previous_close() {
        let quote = PriceQuote::from_prices(110.0, Some(100.0));
        assert!((quote.change - 10.0).abs() < 1e-9);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn quote_without_previous_close_has_no_change() {
        let quote = PriceQuote::from_prices(50.0, None);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_percent, 0.0);

        let zero_prev = PriceQuote::from_prices(50.0, Some(0.0));
        assert_eq!(zero_prev.change_percent, 0.0);
    }

    #[test]
    fn published_day_truncates_timestamps() {
        let item = NewsItem {
            title: "t".into(),
            description: "d".into(),
            source: "s".into(),
            url: "u".into(),
            published_date: "2024-03-15T13:45:00Z".into(),
        };
        assert_eq!(item.published_day(), "2024-03-15");

        let short = NewsItem { published_date: "2024".into(), ..item };
        assert_eq!(short.published_day(), "2024");
    }

    #[test]
    fn frequency_serializes_with_display_names() {
        let json = serde_json::to_string(&DividendFrequency::SemiAnnual).unwrap();
        assert_eq!(json, "\"Semi-Annual\"");
        assert_eq!(DividendFrequency::Quarterly.months(), Some(3));
        assert_eq!(DividendFrequency::None.months(), None);
    }
}
