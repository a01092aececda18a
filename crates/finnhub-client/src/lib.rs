use analysis_core::{AnalysisError, DataSource, NewsArticle, NewsProvider, Profile, Quote, QuoteProvider};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Outbound calls never wait longer than this unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Result<Self, AnalysisError> {
        Self::with_base_url(api_key, BASE_URL.to_string(), DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Configuration("Finnhub API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single GET with no retries. Non-2xx and transport errors map to
    /// `ProviderUnavailable`, undecodable bodies to `MalformedPayload`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AnalysisError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::ProviderUnavailable(format!("Finnhub {path} timed out"))
                } else {
                    AnalysisError::ProviderUnavailable(format!("Finnhub {path}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::ProviderUnavailable(format!(
                "Finnhub {path} HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::ProviderUnavailable(format!("Finnhub {path}: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| AnalysisError::MalformedPayload(format!("Finnhub {path}: {e}")))
    }

    /// Get the current quote. A zero or missing price is a provider failure.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        let raw: QuoteResponse = self.get_json("/quote", &[("symbol", symbol)]).await?;

        if let Some(error) = raw.error {
            return Err(AnalysisError::MalformedPayload(format!("Finnhub quote error: {error}")));
        }

        let price = match raw.c {
            Some(c) if c.is_finite() && c > 0.0 => c,
            _ => {
                return Err(AnalysisError::MalformedPayload(format!(
                    "No valid price from Finnhub for {symbol}"
                )))
            }
        };

        let previous_close = raw.pc.filter(|pc| pc.is_finite() && *pc > 0.0).unwrap_or(0.0);

        let mut quote = Quote::new(symbol.to_uppercase(), price, previous_close)
            .with_source(DataSource::Live);

        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        if let (Some(high), Some(low)) = (positive(raw.h), positive(raw.l)) {
            if high >= low {
                quote = quote.with_range(high, low);
            }
        }

        if let Some(ts) = raw.t.filter(|t| *t > 0) {
            if let Some(at) = DateTime::from_timestamp(ts, 0) {
                quote.timestamp = at;
            }
        }

        Ok(quote)
    }

    /// Company profile merged with beta from the basic-financials endpoint.
    ///
    /// The beta lookup is best-effort; its failure leaves beta at 1.0.
    pub async fn get_profile(&self, symbol: &str) -> Result<Profile, AnalysisError> {
        let raw: ProfileResponse = self.get_json("/stock/profile2", &[("symbol", symbol)]).await?;

        let mut profile = Profile {
            sector: raw
                .finnhub_industry
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| Profile::default().sector),
            market_cap: raw.market_capitalization.filter(|m| m.is_finite() && *m > 0.0),
            name: raw.name.filter(|n| !n.trim().is_empty()),
            ..Profile::default()
        };

        match self.get_beta(symbol).await {
            Ok(Some(beta)) => profile.beta = beta,
            Ok(None) => {}
            Err(e) => tracing::debug!(symbol = %symbol, error = %e, "Beta lookup failed, using 1.0"),
        }

        Ok(profile)
    }

    async fn get_beta(&self, symbol: &str) -> Result<Option<f64>, AnalysisError> {
        let raw: MetricResponse = self
            .get_json("/stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await?;
        Ok(raw
            .metric
            .and_then(|m| m.beta)
            .filter(|b| b.is_finite()))
    }

    /// Company news published between `from` and `to` (inclusive dates).
    pub async fn get_company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>, AnalysisError> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let raw: Vec<NewsItem> = self
            .get_json(
                "/company-news",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await?;

        Ok(raw
            .into_iter()
            .filter(|item| !item.headline.trim().is_empty())
            .map(|item| NewsArticle {
                title: item.headline,
                description: item.summary.filter(|s| !s.trim().is_empty()),
                url: item.url.unwrap_or_default(),
                published_at: DateTime::from_timestamp(item.datetime, 0).unwrap_or_else(Utc::now),
                source: item.source.unwrap_or_else(|| "Finnhub".to_string()),
            })
            .collect())
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        self.get_quote(symbol).await
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Profile, AnalysisError> {
        self.get_profile(symbol).await
    }

    fn provider_name(&self) -> &'static str {
        "Finnhub"
    }
}

#[async_trait]
impl NewsProvider for FinnhubClient {
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>, AnalysisError> {
        self.get_company_news(symbol, from, to).await
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    c: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    l: Option<f64>,
    #[serde(default)]
    pc: Option<f64>,
    #[serde(default)]
    t: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    market_capitalization: Option<f64>,
    #[serde(default)]
    finnhub_industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricResponse {
    #[serde(default)]
    metric: Option<MetricValues>,
}

#[derive(Debug, Deserialize)]
struct MetricValues {
    #[serde(default)]
    beta: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    source: Option<String>,
}
