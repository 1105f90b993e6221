use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{MarketBriefResponse, MarketDashboard, MarketReport};
use crate::services::market_report_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analysis", get(get_analysis))
        .route("/reports", get(list_reports))
        .route("/dashboard", get(get_dashboard))
}

#[derive(Debug, Deserialize)]
struct AnalysisParams {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct ReportParams {
    limit: Option<i64>,
}

async fn get_analysis(
    Query(params): Query<AnalysisParams>,
    State(state): State<AppState>,
) -> Result<Json<MarketBriefResponse>, AppError> {
    info!("GET /market/analysis - force: {}", params.force);
    let briefing = market_report_service::get_briefing(
        &state.pool,
        &state.market,
        &state.ai,
        state.report_offset,
        params.force,
    )
    .await
    .map_err(|e| {
        error!("Failed to produce market briefing: {}", e);
        e
    })?;
    Ok(Json(briefing))
}

async fn list_reports(
    Query(params): Query<ReportParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MarketReport>>, AppError> {
    info!("GET /market/reports - limit: {:?}", params.limit);
    let reports = market_report_service::recent(&state.pool, params.limit).await?;
    Ok(Json(reports))
}

async fn get_dashboard(State(state): State<AppState>) -> Json<MarketDashboard> {
    info!("GET /market/dashboard");
    Json(market_report_service::dashboard(&state.dashboard_cache, &state.market).await)
}
