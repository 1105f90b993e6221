pub mod ai_service;
pub mod auth_service;
pub mod dividend_service;
pub mod llm_service;
pub mod market_data_service;
pub mod market_report_service;
pub mod portfolio_service;
pub mod sec_service;
pub mod stock_service;
pub mod ttl_cache;
pub mod user_service;
pub mod watchlist_service;
