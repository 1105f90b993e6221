use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{AddWatchlistItem, RemovedItem, WatchlistEntryResponse, WatchlistItem};
use crate::routes::auth::CurrentUser;
use crate::services::watchlist_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_watchlist).post(add_to_watchlist))
        .route("/:ticker", delete(remove_from_watchlist))
}

async fn list_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<WatchlistEntryResponse>>, AppError> {
    info!("GET /watchlist - user {}", user.username);
    let entries = watchlist_service::list(&state.pool, &state.market, user.id).await?;
    Ok(Json(entries))
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddWatchlistItem>,
) -> Result<Json<WatchlistItem>, AppError> {
    info!("POST /watchlist - user {} watches {}", user.username, req.ticker);
    let item = watchlist_service::add(&state.pool, &state.market, user.id, &req.ticker).await?;
    Ok(Json(item))
}

async fn remove_from_watchlist(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<RemovedItem>, AppError> {
    info!("DELETE /watchlist/{} - user {}", ticker, user.username);
    let removed = watchlist_service::remove(&state.pool, user.id, &ticker).await?;
    Ok(Json(removed))
}
