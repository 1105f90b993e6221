use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use futures::future::join_all;

use crate::external::market_provider::RawDividends;
use crate::models::{
    DividendFrequency, DividendInfo, DividendPayment, DividendProjection,
    HoldingDividendProjection, MonthlyIncome, PortfolioItem, ProjectedPayment,
};
use crate::services::market_data_service::MarketDataService;

/// Number of calendar months (current month included) covered by a projection.
pub const PROJECTION_MONTHS: u32 = 12;

/// How many recent payments are used to infer the payment cadence.
const FREQUENCY_SAMPLE: usize = 5;

/// Infers the payment cadence from the gaps between recent payments (newest first).
pub fn infer_frequency(history: &[DividendPayment]) -> DividendFrequency {
    match history.len() {
        0 => return DividendFrequency::None,
        1 => return DividendFrequency::Annual,
        _ => {}
    }

    let sample = &history[..history.len().min(FREQUENCY_SAMPLE)];
    let mut gaps: Vec<i64> = sample
        .windows(2)
        .map(|w| (w[0].date - w[1].date).num_days().abs())
        .collect();
    gaps.sort_unstable();

    // Median, so one skipped or special payment does not shift the cadence
    let mid = gaps.len() / 2;
    let gap = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
    } else {
        gaps[mid] as f64
    };

    if gap <= 45.0 {
        DividendFrequency::Monthly
    } else if gap <= 135.0 {
        DividendFrequency::Quarterly
    } else if gap <= 270.0 {
        DividendFrequency::SemiAnnual
    } else {
        DividendFrequency::Annual
    }
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Moves `anchor` forward by `months` calendar months, clamping the day to the
/// target month's length (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(anchor: NaiveDate, months: u32) -> NaiveDate {
    let total = anchor.month0() + months;
    let year = anchor.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    let day = anchor.day().min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(anchor)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the projection window: end of the 11th month after `today`'s month.
pub fn projection_end(today: NaiveDate) -> NaiveDate {
    let last_month = add_months(first_of_month(today), PROJECTION_MONTHS - 1);
    let day = last_day_of_month(last_month.year(), last_month.month());
    last_month.with_day(day).unwrap_or(last_month)
}

/// Rolls the most recent payment forward by the cadence and keeps the dates in
/// `(today, projection_end(today)]`.
pub fn project_payment_dates(
    last_paid: NaiveDate,
    frequency: DividendFrequency,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let Some(step) = frequency.months() else {
        return Vec::new();
    };
    let end = projection_end(today);

    let mut dates = Vec::new();
    let mut k = 1;
    loop {
        // Each step rolls from the anchor: Jan 31 -> Feb 29 -> Mar 31
        let date = add_months(last_paid, k * step);
        if date > end {
            break;
        }
        if date > today {
            dates.push(date);
        }
        k += 1;
    }
    dates
}

/// Normalizes raw provider payments into the dividend summary served to clients.
pub fn summarize(raw: RawDividends, today: NaiveDate) -> DividendInfo {
    let mut payments = raw.payments;
    payments.sort_by(|a, b| b.0.cmp(&a.0));
    payments.dedup_by_key(|(date, _)| *date);

    let history: Vec<DividendPayment> = payments
        .into_iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(date, amount)| DividendPayment { date, amount })
        .collect();

    let window_sum = |from: NaiveDate, to: NaiveDate| -> f64 {
        history
            .iter()
            .filter(|p| p.date > from && p.date <= to)
            .map(|p| p.amount)
            .sum()
    };

    let trailing = window_sum(today - Duration::days(365), today);
    let div_yield = match raw.last_close {
        Some(close) if close > 0.0 => round2(trailing / close * 100.0),
        _ => 0.0,
    };

    let five_years_ago = today - Duration::days(5 * 365);
    let base = window_sum(five_years_ago - Duration::days(365), five_years_ago);
    let growth_rate_5y = if base > 0.0 && trailing > 0.0 {
        round2(((trailing / base).powf(1.0 / 5.0) - 1.0) * 100.0)
    } else {
        0.0
    };

    DividendInfo {
        div_yield,
        frequency: infer_frequency(&history),
        growth_rate_5y,
        history,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn project_holding(
    item: &PortfolioItem,
    info: &DividendInfo,
    today: NaiveDate,
) -> HoldingDividendProjection {
    let (amount_per_share, payments) = match info.history.first() {
        Some(last) => {
            let amount = last.amount * item.shares;
            let payments = project_payment_dates(last.date, info.frequency, today)
                .into_iter()
                .map(|pay_date| ProjectedPayment {
                    ticker: item.ticker.clone(),
                    pay_date,
                    amount,
                })
                .collect::<Vec<_>>();
            (last.amount, payments)
        }
        None => (0.0, Vec::new()),
    };

    HoldingDividendProjection {
        ticker: item.ticker.clone(),
        shares: item.shares,
        frequency: info.frequency,
        amount_per_share,
        annual_income: payments.iter().map(|p| p.amount).sum(),
        payments,
    }
}

/// Combines per-holding projections into monthly buckets and portfolio totals.
pub fn build_projection(
    holdings: &[(PortfolioItem, DividendInfo)],
    today: NaiveDate,
) -> DividendProjection {
    let projections: Vec<HoldingDividendProjection> = holdings
        .iter()
        .map(|(item, info)| project_holding(item, info, today))
        .collect();

    let start = first_of_month(today);
    let mut buckets: BTreeMap<String, f64> = (0..PROJECTION_MONTHS)
        .map(|i| (add_months(start, i).format("%Y-%m").to_string(), 0.0))
        .collect();

    for payment in projections.iter().flat_map(|p| p.payments.iter()) {
        let key = payment.pay_date.format("%Y-%m").to_string();
        if let Some(total) = buckets.get_mut(&key) {
            *total += payment.amount;
        }
    }

    let annual_total: f64 = projections.iter().map(|p| p.annual_income).sum();
    let total_cost: f64 = holdings.iter().map(|(item, _)| item.cost_basis()).sum();
    let yield_on_cost = if total_cost > 0.0 {
        annual_total / total_cost * 100.0
    } else {
        0.0
    };

    DividendProjection {
        holdings: projections,
        monthly: buckets
            .into_iter()
            .map(|(month, amount)| MonthlyIncome { month, amount })
            .collect(),
        annual_total,
        yield_on_cost,
    }
}

/// Fetches dividend data for every holding and projects the next year of income.
pub async fn project_portfolio(
    market: &MarketDataService,
    items: Vec<PortfolioItem>,
    today: NaiveDate,
) -> DividendProjection {
    let infos = join_all(items.iter().map(|item| market.get_dividends(&item.ticker))).await;
    let holdings: Vec<(PortfolioItem, DividendInfo)> = items.into_iter().zip(infos).collect();
    build_projection(&holdings, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pay(date: NaiveDate, amount: f64) -> DividendPayment {
        DividendPayment { date, amount }
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 1, 31), 1), d(2023, 2, 28));
        assert_eq!(add_months(d(2024, 1, 31), 2), d(2024, 3, 31));
        assert_eq!(add_months(d(2024, 11, 15), 3), d(2025, 2, 15));
        assert_eq!(add_months(d(2024, 5, 10), 0), d(2024, 5, 10));
    }

    #[test]
    fn frequency_is_inferred_from_gaps() {
        let monthly = vec![pay(d(2024, 3, 15), 1.0), pay(d(2024, 2, 15), 1.0), pay(d(2024, 1, 15), 1.0)];
        assert_eq!(infer_frequency(&monthly), DividendFrequency::Monthly);

        let quarterly = vec![pay(d(2024, 5, 10), 1.0), pay(d(2024, 2, 9), 1.0), pay(d(2023, 11, 10), 1.0)];
        assert_eq!(infer_frequency(&quarterly), DividendFrequency::Quarterly);

        let semi = vec![pay(d(2024, 6, 1), 1.0), pay(d(2023, 12, 1), 1.0)];
        assert_eq!(infer_frequency(&semi), DividendFrequency::SemiAnnual);

        let annual = vec![pay(d(2024, 6, 1), 1.0), pay(d(2023, 6, 1), 1.0)];
        assert_eq!(infer_frequency(&annual), DividendFrequency::Annual);

        assert_eq!(infer_frequency(&[pay(d(2024, 6, 1), 1.0)]), DividendFrequency::Annual);
        assert_eq!(infer_frequency(&[]), DividendFrequency::None);
    }

    #[test]
    fn quarterly_dates_roll_past_today_within_window() {
        let dates = project_payment_dates(d(2024, 2, 10), DividendFrequency::Quarterly, d(2024, 6, 1));
        // Window is 2024-06-02 ..= 2025-05-31
        assert_eq!(dates, vec![d(2024, 8, 10), d(2024, 11, 10), d(2025, 2, 10), d(2025, 5, 10)]);
    }

    #[test]
    fn stale_history_still_projects_forward() {
        let dates = project_payment_dates(d(2020, 1, 15), DividendFrequency::Monthly, d(2024, 3, 20));
        assert_eq!(dates.len(), 11);
        assert_eq!(dates.first(), Some(&d(2024, 4, 15)));
        assert_eq!(dates.last(), Some(&d(2025, 2, 15)));
    }

    #[test]
    fn month_end_anchor_is_preserved() {
        let dates = project_payment_dates(d(2024, 1, 31), DividendFrequency::Monthly, d(2024, 1, 31));
        assert_eq!(dates[0], d(2024, 2, 29));
        assert_eq!(dates[1], d(2024, 3, 31));
    }

    #[test]
    fn no_frequency_means_no_dates() {
        assert!(project_payment_dates(d(2024, 1, 1), DividendFrequency::None, d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn summarize_computes_yield_and_growth() {
        let today = d(2024, 6, 30);
        let raw = RawDividends {
            last_close: Some(100.0),
            payments: vec![
                (d(2024, 5, 15), 1.0),
                (d(2024, 2, 15), 1.0),
                (d(2023, 11, 15), 1.0),
                (d(2023, 8, 15), 1.0),
                (d(2023, 8, 15), 1.0),
                (d(2019, 5, 15), 0.5),
                (d(2019, 2, 15), 0.5),
                (d(2018, 11, 15), 0.5),
                (d(2018, 8, 15), 0.5),
            ],
        };

        let info = summarize(raw, today);
        assert_eq!(info.history.len(), 8);
        assert_eq!(info.history[0].date, d(2024, 5, 15));
        assert_eq!(info.frequency, DividendFrequency::Quarterly);
        assert_eq!(info.div_yield, 4.0);
        // 2.0 -> 4.0 over five years
        assert!((info.growth_rate_5y - 14.87).abs() < 0.01);
    }

    #[test]
    fn summarize_without_price_has_zero_yield() {
        let info = summarize(
            RawDividends { last_close: None, payments: vec![(d(2024, 1, 1), 0.5)] },
            d(2024, 2, 1),
        );
        assert_eq!(info.div_yield, 0.0);
        assert_eq!(info.growth_rate_5y, 0.0);
    }

    #[test]
    fn portfolio_projection_buckets_by_month() {
        let today = d(2024, 6, 1);
        let item = PortfolioItem::new(Uuid::new_v4(), "O".into(), 100.0, 50.0);
        let info = DividendInfo {
            div_yield: 5.5,
            frequency: DividendFrequency::Monthly,
            growth_rate_5y: 3.2,
            history: vec![pay(d(2024, 5, 15), 0.25)],
        };
        let no_div = PortfolioItem::new(Uuid::new_v4(), "GROW".into(), 10.0, 100.0);

        let projection = build_projection(&[(item, info), (no_div, DividendInfo::empty())], today);

        assert_eq!(projection.monthly.len(), 12);
        assert_eq!(projection.monthly[0].month, "2024-06");
        assert_eq!(projection.monthly[11].month, "2025-05");
        assert!(projection.monthly.iter().all(|m| (m.amount - 25.0).abs() < 1e-9));
        assert!((projection.annual_total - 300.0).abs() < 1e-9);
        // 300 / (5000 + 1000)
        assert!((projection.yield_on_cost - 5.0).abs() < 1e-9);
        assert!(projection.holdings[1].payments.is_empty());
    }
}
