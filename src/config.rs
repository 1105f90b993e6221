use std::net::SocketAddr;

use chrono::FixedOffset;

const DEFAULT_DATABASE_URL: &str = "postgresql://user:password@db:5432/mca_db";

/// Process-wide settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
    pub market: MarketDataConfig,
    pub ai: AiConfig,
    pub sec_user_agent: String,
    pub report_offset: FixedOffset,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub google_client_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketDataConfig {
    pub tiingo_api_key: Option<String>,
    pub serper_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-flash-latest".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8000").parse()?;

        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let offset_hours: i32 = env_or("REPORT_UTC_OFFSET_HOURS", "9").parse()?;
        let report_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("REPORT_UTC_OFFSET_HOURS out of range: {}", offset_hours))?;

        let jwt_secret = match non_empty_env("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set, using an insecure development secret");
                "dev-secret-change-me".to_string()
            }
        };

        Ok(Self {
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr,
            cors_origins,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_minutes: env_or("ACCESS_TOKEN_EXPIRE_MINUTES", "30").parse()?,
                google_client_id: non_empty_env("GOOGLE_CLIENT_ID"),
            },
            market: MarketDataConfig {
                tiingo_api_key: non_empty_env("TIINGO_API_KEY"),
                serper_api_key: non_empty_env("SERPER_API_KEY"),
            },
            ai: AiConfig {
                api_key: non_empty_env("GEMINI_API_KEY"),
                model: env_or("GEMINI_MODEL", "gemini-flash-latest"),
            },
            sec_user_agent: env_or(
                "SEC_USER_AGENT",
                "PersonalInvestmentAssistant/1.0 (contact@example.com)",
            ),
            report_offset,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
