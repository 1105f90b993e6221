use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    AddPortfolioItem, DividendProjection, PortfolioAdvice, PortfolioItem, PortfolioItemResponse,
    RemovedItem, User,
};
use crate::services::ai_service::{AiService, PORTFOLIO_ADVICE_APOLOGY};
use crate::services::market_data_service::{normalize_ticker, MarketDataService};
use crate::services::{dividend_service, stock_service};

fn validate(input: &AddPortfolioItem) -> Result<(), AppError> {
    if !input.shares.is_finite() || input.shares == 0.0 {
        return Err(AppError::Validation("Shares must be a non-zero number".into()));
    }
    if !input.average_cost.is_finite() || input.average_cost < 0.0 {
        return Err(AppError::Validation("Average cost cannot be negative".into()));
    }
    Ok(())
}

/// Holdings valued at current prices. A ticker the market chain could not
/// price is valued at 0.
pub async fn list(
    pool: &PgPool,
    market: &MarketDataService,
    user_id: Uuid,
) -> Result<Vec<PortfolioItemResponse>, AppError> {
    let items = db::portfolio_queries::fetch_for_user(pool, user_id).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let tickers: Vec<String> = items.iter().map(|i| i.ticker.clone()).collect();
    let quotes = market.get_batch_prices(&tickers).await;

    Ok(items
        .iter()
        .map(|item| {
            let price = quotes.get(&item.ticker).map(|q| q.price).unwrap_or_else(|| {
                warn!("No price for {}, valuing at 0", item.ticker);
                0.0
            });
            PortfolioItemResponse::valued(item, price)
        })
        .collect())
}

/// Records a trade. A ticker already held merges into the existing position
/// at the weighted average cost; negative shares sell from it. A new position
/// needs a positive share count. The read and write run in one transaction
/// with the row locked, so concurrent trades on a ticker apply in turn.
pub async fn add(
    pool: &PgPool,
    market: &MarketDataService,
    user_id: Uuid,
    input: AddPortfolioItem,
) -> Result<PortfolioItemResponse, AppError> {
    validate(&input)?;
    let ticker = normalize_ticker(&input.ticker)?;

    stock_service::ensure_stock(pool, market, &ticker).await?;

    let mut tx = pool.begin().await?;
    let existing = match db::portfolio_queries::fetch_one_for_update(&mut tx, user_id, &ticker).await? {
        Some(existing) => Some(existing),
        None if input.shares < 0.0 => {
            return Err(AppError::Validation(format!("No {} position to sell from", ticker)));
        }
        None => {
            let new_item = PortfolioItem::new(user_id, ticker.clone(), input.shares, input.average_cost);
            match db::portfolio_queries::insert_if_absent(&mut tx, new_item).await? {
                Some(inserted) => {
                    tx.commit().await?;
                    return Ok(PortfolioItemResponse::unpriced(&inserted));
                }
                // Lost a race with a concurrent first buy; merge into its row
                None => db::portfolio_queries::fetch_one_for_update(&mut tx, user_id, &ticker).await?,
            }
        }
    };

    let mut position = existing
        .ok_or_else(|| AppError::Internal(format!("{} position vanished during update", ticker)))?;
    position.apply_trade(input.shares, input.average_cost)?;
    info!(
        "Applied trade to {} for user {}: {} shares @ {:.2}",
        ticker, user_id, position.shares, position.average_cost
    );
    let item = db::portfolio_queries::update_position(
        &mut tx,
        position.id,
        position.shares,
        position.average_cost,
    )
    .await?;
    tx.commit().await?;

    Ok(PortfolioItemResponse::unpriced(&item))
}

pub async fn remove(pool: &PgPool, user_id: Uuid, ticker: &str) -> Result<RemovedItem, AppError> {
    let ticker = normalize_ticker(ticker)?;
    match db::portfolio_queries::delete(pool, user_id, &ticker).await? {
        0 => Err(AppError::NotFound("Item not found in portfolio".to_string())),
        _ => Ok(RemovedItem {
            message: "Item removed".to_string(),
            ticker,
        }),
    }
}

pub async fn dividends(
    pool: &PgPool,
    market: &MarketDataService,
    user_id: Uuid,
) -> Result<DividendProjection, AppError> {
    let items = db::portfolio_queries::fetch_for_user(pool, user_id).await?;
    Ok(dividend_service::project_portfolio(market, items, Utc::now().date_naive()).await)
}

pub async fn advice(
    pool: &PgPool,
    market: &MarketDataService,
    ai: &AiService,
    user: &User,
) -> Result<PortfolioAdvice, AppError> {
    let holdings = list(pool, market, user.id).await?;
    let total_value: f64 = holdings.iter().map(|h| h.current_value).sum();

    if holdings.is_empty() {
        return Err(AppError::Validation(
            "Portfolio is empty. Add holdings before requesting advice.".into(),
        ));
    }

    let advice = ai
        .analyze_portfolio(&holdings, &user.prompt_profile())
        .await
        .unwrap_or_else(|_| PORTFOLIO_ADVICE_APOLOGY.to_string());

    Ok(PortfolioAdvice {
        advice,
        total_value,
        holdings: holdings.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(shares: f64, average_cost: f64) -> AddPortfolioItem {
        AddPortfolioItem {
            ticker: "AAPL".to_string(),
            shares,
            average_cost,
        }
    }

    #[test]
    fn rejects_zero_shares_and_negative_cost() {
        assert!(validate(&buy(10.0, 150.0)).is_ok());
        assert!(validate(&buy(1.0, 0.0)).is_ok());
        assert!(validate(&buy(-1.0, 150.0)).is_ok());
        assert!(matches!(validate(&buy(0.0, 150.0)), Err(AppError::Validation(_))));
        assert!(matches!(validate(&buy(1.0, -5.0)), Err(AppError::Validation(_))));
        assert!(matches!(validate(&buy(f64::NAN, 5.0)), Err(AppError::Validation(_))));
    }
}
