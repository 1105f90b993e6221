use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,tower_http=info,sqlx=warn";

/// Loki push target and the labels every shipped line carries.
#[derive(Debug, Clone)]
pub struct LokiTarget {
    pub url: url::Url,
    pub service_name: String,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, from `RUST_LOG`.
    pub filter: String,
    pub environment: String,
    pub loki: Option<LokiTarget>,
}

impl LoggingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let loki = if loki_enabled {
            let raw = lookup("LOKI_URL")
                .filter(|v| !v.trim().is_empty())
                .context("LOKI_ENABLED is true but LOKI_URL is not set")?;
            Some(LokiTarget {
                url: url::Url::parse(&raw).with_context(|| format!("invalid LOKI_URL: {raw}"))?,
                service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "invest-assistant".to_string()),
                environment: environment.clone(),
            })
        } else {
            None
        };

        Ok(Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            environment,
            loki,
        })
    }
}

/// Installs the global subscriber: stdout always, plus Loki when a target is
/// configured. The Loki shipper is spawned on the current tokio runtime.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid RUST_LOG directives: {}", config.filter))?;
    let loki = match &config.loki {
        Some(target) => Some(loki_layer(target)?),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(loki)
        .init();

    match &config.loki {
        Some(target) => tracing::info!("📊 Logging to stdout and Loki at {} ({})", target.url, config.environment),
        None => tracing::info!("📊 Logging to stdout ({})", config.environment),
    }
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(target: &LokiTarget) -> anyhow::Result<tracing_loki::Layer> {
    let (layer, task) = tracing_loki::builder()
        .label("service", &target.service_name)?
        .label("environment", &target.environment)?
        .build_url(target.url.clone())?;

    tokio::spawn(task);
    Ok(layer)
}

#[cfg(not(feature = "loki"))]
fn loki_layer(_target: &LokiTarget) -> anyhow::Result<tracing_subscriber::layer::Identity> {
    anyhow::bail!("LOKI_ENABLED is set but this build has no `loki` feature")
}
