use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use invest_assistant_backend::app;
use invest_assistant_backend::config::AppConfig;
use invest_assistant_backend::db;
use invest_assistant_backend::logging::{init_logging, LoggingConfig};
use invest_assistant_backend::services::market_data_service::MarketDataService;
use invest_assistant_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()?)?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;
    db::schema::ensure_schema(&pool)
        .await
        .context("preparing database schema")?;

    let market = MarketDataService::from_config(&config.market)?;
    let state = AppState::new(pool, &config, market);
    let app = app::create_app(state, &config.cors_origins);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Investment assistant backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
