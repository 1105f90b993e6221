use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{UpdateUserProfile, UserProfileResponse};
use crate::routes::auth::CurrentUser;
use crate::services::user_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Serialize)]
struct ProfileUpdated {
    message: &'static str,
    profile: UserProfileResponse,
}

async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserProfileResponse> {
    info!("GET /user/profile - {}", user.username);
    Json(UserProfileResponse::from(&user))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<UpdateUserProfile>,
) -> Result<Json<ProfileUpdated>, AppError> {
    info!("PUT /user/profile - {}", user.username);
    let updated = user_service::update_profile(&state.pool, &user, update).await?;
    Ok(Json(ProfileUpdated {
        message: "Profile updated successfully",
        profile: UserProfileResponse::from(&updated),
    }))
}
