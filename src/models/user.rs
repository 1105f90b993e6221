use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// How much volatility the user is willing to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    /// Maps the free-text labels the frontend sends onto the three buckets.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" | "conservative" => RiskTolerance::Low,
            "high" | "aggressive" => RiskTolerance::High,
            _ => RiskTolerance::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

impl From<String> for RiskTolerance {
    fn from(value: String) -> Self {
        RiskTolerance::from_label(&value)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub google_sub: Option<String>,
    pub profile_picture: Option<String>,
    #[sqlx(try_from = "String")]
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Json<Vec<String>>,
    pub avoided_sectors: Json<Vec<String>>,
    pub investment_profile: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Flattened view of the profile used when building LLM prompts.
    pub fn prompt_profile(&self) -> InvestorProfile {
        let goal = self
            .investment_profile
            .get("goal")
            .and_then(|v| v.as_str())
            .map(String::from);

        InvestorProfile {
            risk_tolerance: self.risk_tolerance,
            preferred_sectors: self.preferred_sectors.0.clone(),
            avoided_sectors: self.avoided_sectors.0.clone(),
            goal,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvestorProfile {
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Vec<String>,
    pub avoided_sectors: Vec<String>,
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileResponse {
    pub username: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub investment_profile: serde_json::Map<String, serde_json::Value>,
    pub risk_tolerance: RiskTolerance,
    pub preferred_sectors: Vec<String>,
    pub avoided_sectors: Vec<String>,
}

impl From<&User> for UserProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            profile_picture: user.profile_picture.clone(),
            investment_profile: user.investment_profile.0.clone(),
            risk_tolerance: user.risk_tolerance,
            preferred_sectors: user.preferred_sectors.0.clone(),
            avoided_sectors: user.avoided_sectors.0.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserProfile {
    #[serde(default)]
    pub investment_profile: serde_json::Map<String, serde_json::Value>,
    pub risk_tolerance: Option<String>,
    pub years_experience: Option<i32>,
    pub preferred_sectors: Option<Vec<String>>,
    pub avoided_sectors: Option<Vec<String>>,
}
