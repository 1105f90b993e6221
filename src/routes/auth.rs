use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use tracing::{error, info, warn};

use crate::db::user_queries;
use crate::errors::{AppError, AuthError};
use crate::models::{CreateUser, GoogleLoginRequest, LoginForm, TokenResponse, User, UserResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/me", get(me))
}

/// The user behind the request's bearer token. Rejects with 401 when the
/// token is missing, invalid, expired, or names a user that no longer exists.
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::InvalidToken),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.auth.decode_token(token)?;

        let user = user_queries::fetch_by_id(&state.pool, claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
        Ok(CurrentUser(user))
    }
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<CreateUser>,
) -> Result<Json<UserResponse>, AppError> {
    info!("POST /register - Registering user {}", req.username);
    let user = state.auth.register(&state.pool, req).await.map_err(|e| {
        warn!("Registration failed: {}", e);
        e
    })?;
    Ok(Json(UserResponse::from(&user)))
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    info!("POST /token - Login attempt for {}", form.username);
    let user = state
        .auth
        .authenticate(&state.pool, &form.username, &form.password)
        .await?;
    let token = state.auth.issue_token(&user)?;
    Ok(Json(TokenResponse::bearer(token)))
}

async fn google_login(
    State(state): State<AppState>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    info!("POST /auth/google - Google sign-in");
    let identity = state.auth.verify_google_token(&req.credential).await.map_err(|e| {
        warn!("Google token verification failed: {}", e);
        e
    })?;
    let user = state.auth.google_login(&state.pool, &identity).await.map_err(|e| {
        error!("Failed to resolve Google user {}: {}", identity.email, e);
        e
    })?;
    let token = state.auth.issue_token(&user)?;
    Ok(Json(TokenResponse::bearer(token)))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
