use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::db::user_queries;
use crate::errors::{AppError, AuthError};
use crate::models::{Claims, CreateUser, GoogleIdentity, User};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for malformed hashes as well as wrong passwords.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Fields of Google's tokeninfo response that matter for sign-in.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    /// Google sends this as the string "true"/"false".
    #[serde(default)]
    email_verified: serde_json::Value,
    name: Option<String>,
    picture: Option<String>,
}

fn identity_from_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, AuthError> {
    if info.aud != client_id {
        return Err(AuthError::GoogleVerification("token was issued for another client".into()));
    }

    let verified = match &info.email_verified {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    let email = info
        .email
        .filter(|_| verified)
        .ok_or_else(|| AuthError::GoogleVerification("email is missing or unverified".into()))?;

    Ok(GoogleIdentity {
        sub: info.sub,
        email,
        name: info.name,
        picture: info.picture,
    })
}

/// Candidate usernames for a new Google account: the email's local part
/// (without any `+tag`), then the same with a numeric suffix.
fn username_candidates(email: &str) -> impl Iterator<Item = String> {
    let base: String = email
        .split(|c: char| c == '@' || c == '+')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let base = if base.is_empty() { "user".to_string() } else { base };

    std::iter::once(base.clone()).chain((1..).map(move |n| format!("{base}{n}")))
}

/// Message for a unique violation on `users`, chosen by constraint name.
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("email") => "Email already registered",
        Some(name) if name.contains("google_sub") => "Google account already linked",
        _ => "Username already registered",
    }
}

/// A concurrent registration can pass the existence checks and then hit a
/// unique constraint; that is still a 400, not a server error.
fn map_insert_error(e: sqlx::Error) -> AppError {
    let duplicate = match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(conflict_message(db.constraint())),
        _ => None,
    };
    match duplicate {
        Some(message) => AppError::Validation(message.to_string()),
        None => e.into(),
    }
}

/// Password and Google sign-in, plus bearer token issue and validation.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    client: reqwest::Client,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id,
            exp: (Utc::now() + Duration::minutes(self.config.token_ttl_minutes)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }

    pub async fn register(&self, pool: &PgPool, req: CreateUser) -> Result<User, AppError> {
        let username = req.username.trim();
        let email = req.email.trim();
        if username.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(AppError::Validation("Username, email and password are required".into()));
        }

        if user_queries::username_exists(pool, username).await? {
            return Err(AppError::Validation("Username already registered".into()));
        }
        if user_queries::fetch_by_email(pool, email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".into()));
        }

        let hashed = hash_password(&req.password)?;
        let user = user_queries::insert_with_password(pool, username, email, &hashed)
            .await
            .map_err(map_insert_error)?;
        info!("Registered user {}", user.username);
        Ok(user)
    }

    pub async fn authenticate(&self, pool: &PgPool, username: &str, password: &str) -> Result<User, AppError> {
        let user = user_queries::fetch_by_username(pool, username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Google-only accounts have no password to check
        let hashed = user
            .hashed_password
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hashed) {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(user)
    }

    pub async fn verify_google_token(&self, credential: &str) -> Result<GoogleIdentity, AuthError> {
        let client_id = self
            .config
            .google_client_id
            .as_deref()
            .ok_or_else(|| AuthError::GoogleVerification("Google sign-in is not configured".into()))?;

        let resp = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", credential)])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AuthError::GoogleVerification(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::GoogleVerification(format!(
                "tokeninfo returned {}",
                resp.status()
            )));
        }

        let info = resp
            .json::<TokenInfo>()
            .await
            .map_err(|e| AuthError::GoogleVerification(e.to_string()))?;
        identity_from_token_info(info, client_id)
    }

    /// Finds the account for a verified Google identity: by Google subject,
    /// then by email (linking the account), else creates a new one.
    pub async fn google_login(&self, pool: &PgPool, identity: &GoogleIdentity) -> Result<User, AppError> {
        if let Some(user) = user_queries::fetch_by_google_sub(pool, &identity.sub).await? {
            return Ok(user);
        }

        if let Some(user) = user_queries::fetch_by_email(pool, &identity.email).await? {
            info!("Linking Google account to existing user {}", user.username);
            let linked = user_queries::link_google_account(
                pool,
                user.id,
                &identity.sub,
                identity.picture.as_deref(),
            )
            .await?;
            return Ok(linked);
        }

        let mut username = String::new();
        for candidate in username_candidates(&identity.email) {
            if !user_queries::username_exists(pool, &candidate).await? {
                username = candidate;
                break;
            }
        }

        let user = user_queries::insert_google_user(
            pool,
            &username,
            &identity.email,
            &identity.sub,
            identity.picture.as_deref(),
        )
        .await
        .map_err(map_insert_error)?;
        info!("Created user {} from Google sign-in", user.username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn service(ttl_minutes: i64) -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: ttl_minutes,
            google_client_id: Some("client-123".to_string()),
        })
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            hashed_password: None,
            google_sub: None,
            profile_picture: None,
            risk_tolerance: Default::default(),
            preferred_sectors: Json(Vec::new()),
            avoided_sectors: Json(Vec::new()),
            investment_profile: Json(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    fn token_info(aud: &str, verified: serde_json::Value) -> TokenInfo {
        TokenInfo {
            aud: aud.to_string(),
            sub: "google-sub".to_string(),
            email: Some("alice@gmail.com".to_string()),
            email_verified: verified,
            name: Some("Alice".to_string()),
            picture: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hashed = hash_password("hunter2").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hashed));
        assert!(!verify_password("wrong", &hashed));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn issued_token_decodes_to_user_claims() {
        let auth = service(30);
        let user = user();
        let token = auth.issue_token(&user).unwrap();

        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_id, user.id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = service(-120);
        let token = auth.issue_token(&user()).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn garbled_or_foreign_tokens_are_rejected() {
        let auth = service(30);
        assert!(matches!(auth.decode_token("garbage"), Err(AuthError::InvalidToken)));

        let other = AuthService::new(AuthConfig {
            jwt_secret: "other-secret".to_string(),
            token_ttl_minutes: 30,
            google_client_id: None,
        });
        let token = other.issue_token(&user()).unwrap();
        assert!(matches!(auth.decode_token(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn google_identity_requires_matching_audience_and_verified_email() {
        let identity =
            identity_from_token_info(token_info("client-123", "true".into()), "client-123").unwrap();
        assert_eq!(identity.email, "alice@gmail.com");
        assert_eq!(identity.sub, "google-sub");

        assert!(identity_from_token_info(token_info("someone-else", "true".into()), "client-123").is_err());
        assert!(identity_from_token_info(token_info("client-123", "false".into()), "client-123").is_err());
        assert!(identity_from_token_info(token_info("client-123", true.into()), "client-123").is_ok());
    }

    #[test]
    fn unique_violations_name_the_taken_field() {
        assert_eq!(conflict_message(Some("users_email_key")), "Email already registered");
        assert_eq!(conflict_message(Some("users_username_key")), "Username already registered");
        assert_eq!(conflict_message(None), "Username already registered");
        assert!(matches!(
            map_insert_error(sqlx::Error::RowNotFound),
            AppError::Db(sqlx::Error::RowNotFound)
        ));
    }

    #[test]
    fn usernames_derive_from_email_local_part() {
        let names: Vec<String> = username_candidates("john.doe+x@gmail.com").take(3).collect();
        assert_eq!(names, vec!["john.doe", "john.doe1", "john.doe2"]);
        assert_eq!(username_candidates("@x").next().unwrap(), "user");
    }
}
