use std::time::Duration;

use chrono::FixedOffset;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::models::MarketDashboard;
use crate::services::ai_service::AiService;
use crate::services::auth_service::AuthService;
use crate::services::llm_service::LlmService;
use crate::services::market_data_service::MarketDataService;
use crate::services::sec_service::SecService;
use crate::services::ttl_cache::TtlCache;

/// How long the market dashboard payload is reused.
pub const DASHBOARD_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: AuthService,
    pub market: MarketDataService,
    pub ai: AiService,
    pub sec: SecService,
    pub dashboard_cache: TtlCache<MarketDashboard>,
    pub report_offset: FixedOffset,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig, market: MarketDataService) -> Self {
        let llm = LlmService::new(&config.ai);
        Self {
            pool,
            auth: AuthService::new(config.auth.clone()),
            ai: AiService::new(llm, market.clone()),
            market,
            sec: SecService::new(config.sec_user_agent.clone()),
            dashboard_cache: TtlCache::new(DASHBOARD_TTL),
            report_offset: config.report_offset,
        }
    }
}
