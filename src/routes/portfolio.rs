use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    AddPortfolioItem, DividendProjection, PortfolioAdvice, PortfolioItemResponse, RemovedItem,
};
use crate::routes::auth::CurrentUser;
use crate::services::portfolio_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_holdings).post(add_holding))
        .route("/dividends", get(get_dividend_projection))
        .route("/advice", get(get_advice))
        .route("/:ticker", delete(remove_holding))
}

async fn list_holdings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PortfolioItemResponse>>, AppError> {
    info!("GET /portfolio - user {}", user.username);
    let holdings = portfolio_service::list(&state.pool, &state.market, user.id)
        .await
        .map_err(|e| {
            error!("Failed to list portfolio for {}: {}", user.username, e);
            e
        })?;
    Ok(Json(holdings))
}

async fn add_holding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddPortfolioItem>,
) -> Result<Json<PortfolioItemResponse>, AppError> {
    info!(
        "POST /portfolio - user {} adds {} x {} @ {}",
        user.username, input.ticker, input.shares, input.average_cost
    );
    let item = portfolio_service::add(&state.pool, &state.market, user.id, input).await?;
    Ok(Json(item))
}

async fn remove_holding(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<RemovedItem>, AppError> {
    info!("DELETE /portfolio/{} - user {}", ticker, user.username);
    let removed = portfolio_service::remove(&state.pool, user.id, &ticker).await?;
    Ok(Json(removed))
}

async fn get_dividend_projection(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DividendProjection>, AppError> {
    info!("GET /portfolio/dividends - user {}", user.username);
    let projection = portfolio_service::dividends(&state.pool, &state.market, user.id).await?;
    Ok(Json(projection))
}

async fn get_advice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PortfolioAdvice>, AppError> {
    info!("GET /portfolio/advice - user {}", user.username);
    let advice = portfolio_service::advice(&state.pool, &state.market, &state.ai, &user).await?;
    Ok(Json(advice))
}
