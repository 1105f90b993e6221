use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::routes::{auth, health, market, portfolio, stocks, user, watchlist};
use crate::state::AppState;

/// CORS for the configured browser origins. Credentials are allowed, so the
/// origins are listed explicitly rather than wildcarded.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::<AppState>::new()
        .nest("/api/health", health::router())
        .nest("/api", auth::router())
        .nest("/api/stocks", stocks::router())
        .nest("/api/portfolio", portfolio::router())
        .nest("/api/watchlist", watchlist::router())
        .nest("/api/market", market::router())
        .nest("/api/user", user::router())
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
