use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{RiskTolerance, User};

const USER_COLUMNS: &str = "id, username, email, hashed_password, google_sub, profile_picture, \
     risk_tolerance, preferred_sectors, avoided_sectors, investment_profile, created_at";

pub async fn fetch_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_google_sub(pool: &PgPool, sub: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE google_sub = $1"))
        .bind(sub)
        .fetch_optional(pool)
        .await
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub async fn insert_with_password(
    pool: &PgPool,
    username: &str,
    email: &str,
    hashed_password: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, email, hashed_password)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .fetch_one(pool)
    .await
}

pub async fn insert_google_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    google_sub: &str,
    profile_picture: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, email, google_sub, profile_picture)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(google_sub)
    .bind(profile_picture)
    .fetch_one(pool)
    .await
}

/// Attaches a Google identity to an account first created with a password.
pub async fn link_google_account(
    pool: &PgPool,
    id: Uuid,
    google_sub: &str,
    profile_picture: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users
         SET google_sub = $2, profile_picture = COALESCE($3, profile_picture)
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(google_sub)
    .bind(profile_picture)
    .fetch_one(pool)
    .await
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    investment_profile: &serde_json::Map<String, serde_json::Value>,
    risk_tolerance: RiskTolerance,
    preferred_sectors: &[String],
    avoided_sectors: &[String],
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users
         SET investment_profile = $2, risk_tolerance = $3,
             preferred_sectors = $4, avoided_sectors = $5
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(Json(investment_profile))
    .bind(risk_tolerance.as_str())
    .bind(Json(preferred_sectors))
    .bind(Json(avoided_sectors))
    .fetch_one(pool)
    .await
}
