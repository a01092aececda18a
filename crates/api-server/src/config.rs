use anyhow::{bail, Context, Result};
use risk_gateway::GatewayConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Market data (absent key means demo mode)
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,

    // Narrative / sentiment LLM (absent key means template narratives)
    pub claude_api_key: Option<String>,
    pub claude_model: String,
    pub claude_base_url: String,
    pub claude_max_tokens: u32,

    pub provider_timeout: Duration,

    // Cache tuning, seconds
    pub quote_cache_ttl_secs: u64,
    pub narrative_cache_ttl_secs: u64,
    pub narrative_window_secs: u64,
    pub news_cache_ttl_secs: u64,
    pub cache_capacity: usize,

    pub default_watchlist: Vec<String>,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            finnhub_api_key: get("FINNHUB_API_KEY"),
            finnhub_base_url: get("FINNHUB_BASE_URL")
                .unwrap_or_else(|| finnhub_client::BASE_URL.to_string()),

            claude_api_key: get("CLAUDE_API_KEY"),
            claude_model: get("CLAUDE_MODEL").unwrap_or_else(|| llm_client::DEFAULT_MODEL.to_string()),
            claude_base_url: get("CLAUDE_BASE_URL")
                .unwrap_or_else(|| llm_client::DEFAULT_BASE_URL.to_string()),
            claude_max_tokens: positive(&get, "CLAUDE_MAX_TOKENS", llm_client::DEFAULT_MAX_TOKENS)?,

            provider_timeout: Duration::from_secs(positive(&get, "PROVIDER_TIMEOUT_SECS", 10u64)?),

            quote_cache_ttl_secs: positive(&get, "QUOTE_CACHE_TTL_SECS", 60)?,
            narrative_cache_ttl_secs: positive(&get, "NARRATIVE_CACHE_TTL_SECS", 1800)?,
            narrative_window_secs: positive(&get, "NARRATIVE_WINDOW_SECS", 300)?,
            news_cache_ttl_secs: positive(&get, "NEWS_CACHE_TTL_SECS", 900)?,
            cache_capacity: positive(&get, "CACHE_CAPACITY", 50usize)?,

            default_watchlist: get("DEFAULT_WATCHLIST")
                .unwrap_or_else(|| "AAPL,MSFT,GOOGL,TSLA,NVDA".to_string())
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        Ok(config)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let secs = |s: u64| chrono::Duration::seconds(s as i64);
        GatewayConfig {
            quote_ttl: secs(self.quote_cache_ttl_secs),
            narrative_ttl: secs(self.narrative_cache_ttl_secs),
            narrative_window: secs(self.narrative_window_secs),
            news_ttl: secs(self.news_cache_ttl_secs),
            cache_capacity: self.cache_capacity,
            ..GatewayConfig::default()
        }
    }
}

/// Parse an optional numeric setting, rejecting zero and garbage.
fn positive<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    let value = match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a positive integer, got {raw:?}"))?,
        None => default,
    };
    if value == T::default() {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
