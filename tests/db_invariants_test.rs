/// Database Invariant Tests
///
/// Checks the behavior that only holds with a real Postgres behind it:
/// - Watchlist add is idempotent per (user, ticker)
/// - Duplicate username or email registration is a 400
/// - Stored briefings are reused unless forced; failed briefings are not stored
/// - Concurrent trades on one position are applied in turn
///
/// NOTE: Runs against TEST_DATABASE_URL and is skipped when it is not set.
/// Every test works on freshly named users and tickers, so a shared
/// database is fine.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use invest_assistant_backend::config::AuthConfig;
use invest_assistant_backend::db::{self, market_report_queries, stock_queries, user_queries, watchlist_queries};
use invest_assistant_backend::errors::{AppError, LlmError};
use invest_assistant_backend::external::market_provider::MarketDataProvider;
use invest_assistant_backend::models::{AddPortfolioItem, CreateStock, CreateUser, DayPart, User};
use invest_assistant_backend::services::ai_service::{AiService, MARKET_BRIEFING_APOLOGY};
use invest_assistant_backend::services::auth_service::AuthService;
use invest_assistant_backend::services::llm_service::{LlmProvider, LlmService};
use invest_assistant_backend::services::market_data_service::MarketDataService;
use invest_assistant_backend::services::{market_report_service, portfolio_service};

static SCHEMA: OnceCell<()> = OnceCell::const_new();

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    SCHEMA
        .get_or_try_init(|| db::schema::ensure_schema(&pool))
        .await
        .expect("prepare schema");
    Some(pool)
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

fn offline_market() -> MarketDataService {
    let providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
    MarketDataService::new(providers)
}

fn auth() -> AuthService {
    AuthService::new(AuthConfig {
        jwt_secret: "test-secret".to_string(),
        token_ttl_minutes: 30,
        google_client_id: None,
    })
}

async fn create_user(pool: &PgPool) -> User {
    let username = unique("user_");
    user_queries::insert_with_password(pool, &username, &format!("{username}@example.com"), "x")
        .await
        .unwrap()
}

struct Unavailable;

#[async_trait]
impl LlmProvider for Unavailable {
    async fn generate_completion(&self, _prompt: String) -> Result<String, LlmError> {
        Err(LlmError::RateLimited)
    }
}

#[tokio::test]
async fn watchlist_add_returns_existing_row() {
    let Some(pool) = test_pool().await else { return };
    let user = create_user(&pool).await;
    let ticker = unique("W").to_uppercase();
    stock_queries::insert(
        &pool,
        CreateStock {
            ticker: ticker.clone(),
            name: "Watched Co".to_string(),
            sector: "Unknown".to_string(),
            market_cap: None,
            current_price: Some(10.0),
            dividend_yield: None,
        },
    )
    .await
    .unwrap();

    let first = watchlist_queries::insert_or_get(&pool, user.id, &ticker).await.unwrap();
    let second = watchlist_queries::insert_or_get(&pool, user.id, &ticker).await.unwrap();
    assert_eq!(first.id, second.id);

    let entries = watchlist_queries::fetch_entries(&pool, user.id).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn duplicate_registration_is_a_validation_error() {
    let Some(pool) = test_pool().await else { return };
    let auth = auth();
    let username = unique("reg_");
    let email = format!("{username}@example.com");

    auth.register(
        &pool,
        CreateUser {
            username: username.clone(),
            email: email.clone(),
            password: "hunter2".to_string(),
        },
    )
    .await
    .unwrap();

    let same_name = auth
        .register(
            &pool,
            CreateUser {
                username: username.clone(),
                email: format!("other_{email}"),
                password: "hunter2".to_string(),
            },
        )
        .await;
    assert!(matches!(same_name, Err(AppError::Validation(msg)) if msg == "Username already registered"));

    let same_email = auth
        .register(
            &pool,
            CreateUser {
                username: unique("reg_"),
                email,
                password: "hunter2".to_string(),
            },
        )
        .await;
    assert!(matches!(same_email, Err(AppError::Validation(msg)) if msg == "Email already registered"));
}

#[tokio::test]
async fn fresh_briefing_is_reused_unless_forced() {
    let Some(pool) = test_pool().await else { return };
    let market = offline_market();
    let ai = AiService::new(LlmService::with_provider(Arc::new(Unavailable)), market.clone());
    let kst = FixedOffset::east_opt(9 * 3600).unwrap();

    let content = unique("stored briefing ");
    let stored = market_report_queries::insert(&pool, &content, DayPart::Morning)
        .await
        .unwrap();

    let reused = market_report_service::get_briefing(&pool, &market, &ai, kst, false)
        .await
        .unwrap();
    assert!(reused.cached);
    assert_eq!(reused.analysis, content);

    let forced = market_report_service::get_briefing(&pool, &market, &ai, kst, true)
        .await
        .unwrap();
    assert!(!forced.cached);
    assert_eq!(forced.analysis, MARKET_BRIEFING_APOLOGY);

    let latest = market_report_queries::fetch_latest(&pool).await.unwrap().unwrap();
    assert_eq!(latest.id, stored.id);
}

#[tokio::test]
async fn concurrent_buys_both_land() {
    let Some(pool) = test_pool().await else { return };
    let market = offline_market();
    let user = create_user(&pool).await;
    let ticker = unique("P").to_uppercase();

    let buy = |shares: f64, average_cost: f64| AddPortfolioItem {
        ticker: ticker.clone(),
        shares,
        average_cost,
    };
    let (a, b) = tokio::join!(
        portfolio_service::add(&pool, &market, user.id, buy(10.0, 100.0)),
        portfolio_service::add(&pool, &market, user.id, buy(10.0, 200.0)),
    );
    a.unwrap();
    b.unwrap();

    let items = db::portfolio_queries::fetch_for_user(&pool, user.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].shares, 20.0);
    assert!((items[0].average_cost - 150.0).abs() < 1e-9);

    let oversell = portfolio_service::add(&pool, &market, user.id, buy(-25.0, 0.0)).await;
    assert!(matches!(oversell, Err(AppError::Validation(_))));

    let sold = portfolio_service::add(&pool, &market, user.id, buy(-5.0, 0.0)).await.unwrap();
    assert_eq!(sold.shares, 15.0);
    assert!((sold.average_cost - 150.0).abs() < 1e-9);
}
