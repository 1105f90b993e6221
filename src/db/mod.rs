pub mod market_report_queries;
pub mod portfolio_queries;
pub mod schema;
pub mod stock_queries;
pub mod user_queries;
pub mod watchlist_queries;
