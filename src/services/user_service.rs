use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::info;

use crate::db::user_queries;
use crate::errors::AppError;
use crate::models::{RiskTolerance, UpdateUserProfile, User};

/// Profile after applying an update: the JSON profile is merged key by key,
/// risk tolerance (when non-blank) and sector lists are replaced only when present.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedProfile {
    pub investment_profile: Map<String, Value>,
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Vec<String>,
    pub avoided_sectors: Vec<String>,
}

pub fn merge_profile(user: &User, update: UpdateUserProfile) -> MergedProfile {
    let mut investment_profile = user.investment_profile.0.clone();
    investment_profile.extend(update.investment_profile);

    if let Some(years) = update.years_experience {
        investment_profile.insert("years_experience".to_string(), Value::from(years));
    }

    MergedProfile {
        investment_profile,
        risk_tolerance: update
            .risk_tolerance
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(RiskTolerance::from_label)
            .unwrap_or(user.risk_tolerance),
        preferred_sectors: update
            .preferred_sectors
            .unwrap_or_else(|| user.preferred_sectors.0.clone()),
        avoided_sectors: update
            .avoided_sectors
            .unwrap_or_else(|| user.avoided_sectors.0.clone()),
    }
}

pub async fn update_profile(pool: &PgPool, user: &User, update: UpdateUserProfile) -> Result<User, AppError> {
    let merged = merge_profile(user, update);
    let updated = user_queries::update_profile(
        pool,
        user.id,
        &merged.investment_profile,
        merged.risk_tolerance,
        &merged.preferred_sectors,
        &merged.avoided_sectors,
    )
    .await?;
    info!(
        "Updated profile for {} (risk tolerance: {})",
        updated.username,
        updated.risk_tolerance.as_str()
    );
    Ok(updated)
}
