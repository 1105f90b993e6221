use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::DividendFrequency;

// A (user, ticker) position. Repeated buys are folded into one row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub shares: f64,
    pub average_cost: f64,
}

impl PortfolioItem {
    pub fn new(user_id: Uuid, ticker: String, shares: f64, average_cost: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            ticker,
            shares,
            average_cost,
        }
    }

    /// Applies a trade to this position. A buy folds in at the weighted
    /// average cost; a sale (negative `shares`) only reduces the share count,
    /// so the remaining shares keep their cost. Selling more than is held is
    /// rejected and leaves the position unchanged.
    pub fn apply_trade(&mut self, shares: f64, price: f64) -> Result<(), String> {
        if shares >= 0.0 {
            let (total_shares, average_cost) =
                weighted_average(self.shares, self.average_cost, shares, price);
            self.shares = total_shares;
            self.average_cost = average_cost;
            return Ok(());
        }

        let remaining = self.shares + shares;
        if remaining < 0.0 {
            return Err(format!(
                "Cannot sell {} shares of {}: only {} held",
                -shares, self.ticker, self.shares
            ));
        }
        self.shares = remaining;
        if remaining == 0.0 {
            self.average_cost = 0.0;
        }
        Ok(())
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares * self.average_cost
    }
}

/// Returns `(total_shares, new_average_cost)`; the average is 0 when no shares remain.
pub fn weighted_average(
    held_shares: f64,
    held_cost: f64,
    bought_shares: f64,
    bought_price: f64,
) -> (f64, f64) {
    let total_shares = held_shares + bought_shares;
    let total_cost = held_shares * held_cost + bought_shares * bought_price;
    let average = if total_shares > 0.0 {
        total_cost / total_shares
    } else {
        0.0
    };
    (total_shares, average)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPortfolioItem {
    pub ticker: String,
    pub shares: f64,
    pub average_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioItemResponse {
    pub id: Uuid,
    pub ticker: String,
    pub shares: f64,
    pub average_cost: f64,
    pub current_price: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
}

impl PortfolioItemResponse {
    /// Values a position at `current_price`; gain % is 0 when there is no cost basis.
    pub fn valued(item: &PortfolioItem, current_price: f64) -> Self {
        let current_value = current_price * item.shares;
        let total_cost = item.cost_basis();
        let gain_loss = current_value - total_cost;
        let gain_loss_percent = if total_cost > 0.0 {
            gain_loss / total_cost * 100.0
        } else {
            0.0
        };

        Self {
            id: item.id,
            ticker: item.ticker.clone(),
            shares: item.shares,
            average_cost: item.average_cost,
            current_price,
            current_value,
            gain_loss,
            gain_loss_percent,
        }
    }

    /// Response for a freshly written row, before any price lookup.
    pub fn unpriced(item: &PortfolioItem) -> Self {
        Self {
            id: item.id,
            ticker: item.ticker.clone(),
            shares: item.shares,
            average_cost: item.average_cost,
            current_price: 0.0,
            current_value: 0.0,
            gain_loss: 0.0,
            gain_loss_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedItem {
    pub message: String,
    pub ticker: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioAdvice {
    pub advice: String,
    pub total_value: f64,
    pub holdings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPayment {
    pub ticker: String,
    pub pay_date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingDividendProjection {
    pub ticker: String,
    pub shares: f64,
    pub frequency: DividendFrequency,
    pub amount_per_share: f64,
    pub annual_income: f64,
    pub payments: Vec<ProjectedPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyIncome {
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DividendProjection {
    pub holdings: Vec<HoldingDividendProjection>,
    pub monthly: Vec<MonthlyIncome>,
    pub annual_total: f64,
    pub yield_on_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_buys_use_weighted_average() {
        let mut item = PortfolioItem::new(Uuid::new_v4(), "AAPL".into(), 10.0, 100.0);
        item.apply_trade(10.0, 200.0).unwrap();
        assert_eq!(item.shares, 20.0);
        assert!((item.average_cost - 150.0).abs() < 1e-9);

        item.apply_trade(5.0, 50.0).unwrap();
        assert_eq!(item.shares, 25.0);
        assert!((item.average_cost - 130.0).abs() < 1e-9);
    }

    #[test]
    fn sale_keeps_cost_of_remaining_shares() {
        let mut item = PortfolioItem::new(Uuid::new_v4(), "AAPL".into(), 10.0, 100.0);
        item.apply_trade(-5.0, 150.0).unwrap();
        assert_eq!(item.shares, 5.0);
        assert_eq!(item.average_cost, 100.0);

        item.apply_trade(-5.0, 150.0).unwrap();
        assert_eq!(item.shares, 0.0);
        assert_eq!(item.average_cost, 0.0);
    }

    #[test]
    fn overselling_is_rejected_without_changing_position() {
        let mut item = PortfolioItem::new(Uuid::new_v4(), "AAPL".into(), 10.0, 100.0);
        let err = item.apply_trade(-15.0, 100.0).unwrap_err();
        assert!(err.contains("only 10 held"));
        assert_eq!(item.shares, 10.0);
        assert_eq!(item.average_cost, 100.0);
    }

    #[test]
    fn zero_total_shares_resets_average() {
        assert_eq!(weighted_average(0.0, 10.0, 0.0, 20.0), (0.0, 0.0));
        assert_eq!(weighted_average(5.0, 10.0, -5.0, 20.0), (0.0, 0.0));
    }

    #[test]
    fn valuation_computes_gain_and_percent() {
        let item = PortfolioItem::new(Uuid::new_v4(), "MSFT".into(), 4.0, 100.0);
        let valued = PortfolioItemResponse::valued(&item, 125.0);
        assert_eq!(valued.current_value, 500.0);
        assert_eq!(valued.gain_loss, 100.0);
        assert!((valued.gain_loss_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn valuation_with_zero_cost_has_zero_percent() {
        let item = PortfolioItem::new(Uuid::new_v4(), "FREE".into(), 4.0, 0.0);
        let valued = PortfolioItemResponse::valued(&item, 10.0);
        assert_eq!(valued.gain_loss, 40.0);
        assert_eq!(valued.gain_loss_percent, 0.0);
    }
}
