use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisError, NewsArticle, Profile, Quote};

/// Market-data provider for quotes and company profiles.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AnalysisError>;

    /// Best-effort enrichment. Callers fall back to `Profile::default()` on error.
    async fn fetch_profile(&self, symbol: &str) -> Result<Profile, AnalysisError>;

    fn provider_name(&self) -> &'static str;
}

/// Large-language-model provider returning free-form text for a prompt.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError>;

    fn provider_name(&self) -> &'static str;
}

/// Company news source.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>, AnalysisError>;
}
