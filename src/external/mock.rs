//! Static payloads returned when every upstream source has failed.

use chrono::NaiveDate;

use crate::models::{
    DividendFrequency, DividendInfo, DividendPayment, ExchangeRate, NewsItem, PriceQuote,
    StockProfile,
};

pub fn profile(ticker: &str) -> StockProfile {
    let (name, sector, description, market_cap) = match ticker {
        "AAPL" => (
            "Apple Inc.",
            "Technology",
            "Apple Inc. designs, manufactures, and markets smartphones, personal computers, tablets, wearables, and accessories.",
            3_000_000_000_000.0,
        ),
        "MSFT" => (
            "Microsoft Corporation",
            "Technology",
            "Microsoft Corporation develops, licenses, and supports software, services, devices, and solutions.",
            2_800_000_000_000.0,
        ),
        "O" => (
            "Realty Income Corporation",
            "Real Estate",
            "Realty Income, The Monthly Dividend Company, is an S&P 500 company dedicated to providing stockholders with dependable monthly income.",
            40_000_000_000.0,
        ),
        _ => {
            return StockProfile {
                ticker: ticker.to_string(),
                name: format!("{ticker} Inc."),
                sector: "Unknown".to_string(),
                description: "Mock description for development.".to_string(),
                market_cap: Some(1_000_000_000.0),
                exchange: None,
            }
        }
    };

    StockProfile {
        ticker: ticker.to_string(),
        name: name.to_string(),
        sector: sector.to_string(),
        description: description.to_string(),
        market_cap: Some(market_cap),
        exchange: None,
    }
}

pub fn price(ticker: &str) -> PriceQuote {
    let (price, change, change_percent) = match ticker {
        "AAPL" => (185.50, 1.25, 0.68),
        "MSFT" => (420.10, -2.30, -0.55),
        "O" => (52.30, 0.15, 0.29),
        _ => (100.00, 0.0, 0.0),
    };
    PriceQuote {
        price,
        change,
        change_percent,
        previous_close: None,
    }
}

pub fn dividends(ticker: &str) -> DividendInfo {
    let payment = |y, m, d, amount| DividendPayment {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
        amount,
    };

    match ticker {
        "O" => DividendInfo {
            div_yield: 5.5,
            frequency: DividendFrequency::Monthly,
            growth_rate_5y: 3.2,
            history: vec![
                payment(2024, 1, 15, 0.256),
                payment(2023, 12, 15, 0.256),
                payment(2023, 11, 15, 0.256),
            ],
        },
        "AAPL" => DividendInfo {
            div_yield: 0.5,
            frequency: DividendFrequency::Quarterly,
            growth_rate_5y: 6.5,
            history: vec![payment(2024, 2, 10, 0.24), payment(2023, 11, 10, 0.24)],
        },
        _ => DividendInfo::empty(),
    }
}

pub fn news(_ticker: Option<&str>) -> Vec<NewsItem> {
    Vec::new()
}

pub fn exchange_rate(pair: &str) -> ExchangeRate {
    let rate = match pair {
        "usdkrw" => 1350.0,
        "usdjpy" => 150.0,
        "eurusd" => 1.08,
        _ => 1.0,
    };
    ExchangeRate {
        pair: pair.to_string(),
        rate,
    }
}
