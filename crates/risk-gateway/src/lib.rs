//! Provider gateway: cache-first access to quotes, narratives and news
//! sentiment, with local fallback synthesis on any provider failure.

pub mod cache;
pub mod fallback;
pub mod narrative;
pub mod news;

#[cfg(test)]
mod gateway_tests;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use narrative::{build_prompt, extract_json_object, parse_analysis};
pub use news::{build_sentiment_prompt, dedupe_articles, parse_sentiment};

use analysis_core::{
    normalize_symbol, AnalysisError, DerivedMetrics, MarketSnapshot, NarrativeProvider,
    NarrativeReport, NarrativeSource, NewsProvider, NewsSentiment, NewsTimeframe, Profile, Quote,
    QuoteProvider, StockAnalysis,
};
use chrono::Duration;
use dashmap::DashMap;
use risk_metrics::{MetricsEngine, Precedence, RSI_PERIOD};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Gateway tunables. Library code never reads the environment; the binary
/// fills this in from its own configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub quote_ttl: Duration,
    pub narrative_ttl: Duration,
    /// Width of the time bucket folded into narrative cache keys
    pub narrative_window: Duration,
    pub news_ttl: Duration,
    /// Soft entry ceiling shared by every cache
    pub cache_capacity: usize,
    pub precedence: Precedence,
    /// Live closes kept per symbol for the history-based RSI
    pub close_history_len: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            quote_ttl: Duration::seconds(60),
            narrative_ttl: Duration::minutes(30),
            narrative_window: Duration::minutes(5),
            news_ttl: Duration::minutes(15),
            cache_capacity: 50,
            precedence: Precedence::default(),
            close_history_len: 64,
        }
    }
}

/// Which providers are wired in
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub quotes: bool,
    pub narrative: bool,
    pub news: bool,
}

pub struct RiskGateway {
    quote_provider: Option<Arc<dyn QuoteProvider>>,
    narrative_provider: Option<Arc<dyn NarrativeProvider>>,
    news_provider: Option<Arc<dyn NewsProvider>>,
    engine: MetricsEngine,
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    quote_cache: TtlCache<Quote>,
    profile_cache: TtlCache<Profile>,
    narrative_cache: TtlCache<NarrativeReport>,
    news_cache: TtlCache<NewsSentiment>,
    close_history: DashMap<String, VecDeque<f64>>,
}

impl RiskGateway {
    /// A missing provider puts that path permanently in fallback mode.
    pub fn new(
        quote_provider: Option<Arc<dyn QuoteProvider>>,
        narrative_provider: Option<Arc<dyn NarrativeProvider>>,
        news_provider: Option<Arc<dyn NewsProvider>>,
        config: GatewayConfig,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            quote_provider,
            narrative_provider,
            news_provider,
            engine: MetricsEngine::with_precedence(config.precedence),
            quote_cache: TtlCache::new(config.quote_ttl, config.cache_capacity, clock.clone()),
            profile_cache: TtlCache::new(config.quote_ttl, config.cache_capacity, clock.clone()),
            narrative_cache: TtlCache::new(config.narrative_ttl, config.cache_capacity, clock.clone()),
            news_cache: TtlCache::new(config.news_ttl, config.cache_capacity, clock.clone()),
            close_history: DashMap::new(),
            clock,
            config,
        }
    }

    /// Replace the time source. Clears every cache.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let capacity = self.config.cache_capacity;
        self.quote_cache = TtlCache::new(self.config.quote_ttl, capacity, clock.clone());
        self.profile_cache = TtlCache::new(self.config.quote_ttl, capacity, clock.clone());
        self.narrative_cache = TtlCache::new(self.config.narrative_ttl, capacity, clock.clone());
        self.news_cache = TtlCache::new(self.config.news_ttl, capacity, clock.clone());
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    pub fn provider_status(&self) -> ProviderStatus {
        ProviderStatus {
            quotes: self.quote_provider.is_some(),
            narrative: self.narrative_provider.is_some(),
            news: self.news_provider.is_some(),
        }
    }

    /// Current quote for `symbol`. Only `InvalidInput` escapes; every provider
    /// failure yields a demo quote tagged `DataSource::Demo`.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(quote) = self.quote_cache.get(&symbol) {
            debug!(symbol = %symbol, "Quote cache hit");
            return Ok(quote);
        }

        let Some(provider) = &self.quote_provider else {
            debug!(symbol = %symbol, "No quote provider configured, using demo data");
            return Ok(fallback::demo_quote(&symbol, self.clock.now()));
        };

        let fetched = provider
            .fetch_quote(&symbol)
            .await
            .and_then(|quote| quote.validate().map(|_| quote));

        match fetched {
            Ok(quote) => {
                self.record_close(&quote);
                self.quote_cache.insert(symbol, quote.clone());
                Ok(quote)
            }
            Err(e) => {
                warn!(
                    symbol = %symbol,
                    provider = provider.provider_name(),
                    error = %e,
                    "Quote provider failed, using demo data"
                );
                Ok(fallback::demo_quote(&symbol, self.clock.now()))
            }
        }
    }

    /// Live prices seen for `symbol`, oldest first.
    pub fn close_history(&self, symbol: &str) -> Vec<f64> {
        self.close_history
            .get(symbol)
            .map(|closes| closes.iter().copied().collect())
            .unwrap_or_default()
    }

    fn record_close(&self, quote: &Quote) {
        let limit = self.config.close_history_len.max(RSI_PERIOD + 1);
        let mut closes = self.close_history.entry(quote.symbol.clone()).or_default();
        closes.push_back(quote.price);
        while closes.len() > limit {
            closes.pop_front();
        }
    }

    /// Quote plus best-effort profile. A profile failure never fails the snapshot.
    pub async fn get_market_snapshot(&self, symbol: &str) -> Result<MarketSnapshot, AnalysisError> {
        let quote = self.get_quote(symbol).await?;
        let profile = self.get_profile(&quote).await;
        Ok(MarketSnapshot { quote, profile })
    }

    async fn get_profile(&self, quote: &Quote) -> Profile {
        let symbol = quote.symbol.as_str();

        if quote.data_source.is_fallback() {
            return fallback::demo_profile(symbol);
        }

        if let Some(profile) = self.profile_cache.get(symbol) {
            return profile;
        }

        let Some(provider) = &self.quote_provider else {
            return fallback::demo_profile(symbol);
        };

        match provider.fetch_profile(symbol).await {
            Ok(profile) => {
                self.profile_cache.insert(symbol, profile.clone());
                profile
            }
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "Profile unavailable, using defaults");
                Profile::default()
            }
        }
    }

    /// Quote, profile and derived metrics for one ticker.
    pub async fn analyze(&self, symbol: &str) -> Result<StockAnalysis, AnalysisError> {
        let MarketSnapshot { quote, profile } = self.get_market_snapshot(symbol).await?;
        let metrics = if quote.data_source.is_fallback() {
            self.engine.compute(&quote, Some(&profile))
        } else {
            let closes = self.close_history(&quote.symbol);
            self.engine.compute_with_history(&quote, Some(&profile), &closes)
        };

        info!(
            symbol = %quote.symbol,
            source = %quote.data_source,
            signal = %metrics.signal,
            risk_score = metrics.risk_score,
            "Analysis complete"
        );

        Ok(StockAnalysis {
            symbol: quote.symbol.clone(),
            quote,
            profile,
            metrics,
            analyzed_at: self.clock.now(),
        })
    }

    /// Analyze each ticker in turn. Invalid tickers are skipped with a warning.
    pub async fn analyze_all(&self, symbols: &[String]) -> Vec<StockAnalysis> {
        let mut results = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.analyze(symbol).await {
                Ok(analysis) => results.push(analysis),
                Err(e) => warn!(symbol = %symbol, error = %e, "Skipping ticker"),
            }
        }
        results
    }

    /// Narrative commentary for a ticker, keyed on the signal and risk score
    /// within the current time window. Only `InvalidInput` escapes.
    pub async fn get_narrative(
        &self,
        symbol: &str,
        price: f64,
        metrics: &DerivedMetrics,
    ) -> Result<NarrativeReport, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let now = self.clock.now();

        let window = self.config.narrative_window.num_seconds().max(1);
        let bucket = now.timestamp().div_euclid(window);
        let key = format!("{symbol}:{}:{}:{bucket}", metrics.signal, metrics.risk_score);

        if let Some(report) = self.narrative_cache.get(&key) {
            debug!(symbol = %symbol, "Narrative cache hit");
            return Ok(report);
        }

        let Some(provider) = &self.narrative_provider else {
            debug!(symbol = %symbol, "No narrative provider configured, using template");
            return Ok(fallback_report(&symbol, NarrativeSource::FallbackUnavailable, now));
        };

        let prompt = build_prompt(&symbol, price, metrics, metrics.signal);
        let text = match provider.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    symbol = %symbol,
                    provider = provider.provider_name(),
                    error = %e,
                    "Narrative provider failed, using template"
                );
                return Ok(fallback_report(&symbol, NarrativeSource::FallbackUnavailable, now));
            }
        };

        let Some(analysis) = parse_analysis(&text) else {
            warn!(symbol = %symbol, "No usable JSON in narrative reply, using template");
            return Ok(fallback_report(&symbol, NarrativeSource::FallbackUnparsed, now));
        };

        let report = NarrativeReport {
            ticker: symbol,
            analysis,
            source: NarrativeSource::Ai,
            fallback: false,
            note: None,
            generated_at: now,
        };
        self.narrative_cache.insert(key, report.clone());
        Ok(report)
    }

    /// Sentiment over recent company news. Only `InvalidInput` escapes.
    pub async fn get_news_sentiment(
        &self,
        symbol: &str,
        timeframe: NewsTimeframe,
    ) -> Result<NewsSentiment, AnalysisError> {
        let symbol = normalize_symbol(symbol)?;
        let now = self.clock.now();
        let key = format!("{symbol}:{}", timeframe.as_str());

        if let Some(sentiment) = self.news_cache.get(&key) {
            debug!(symbol = %symbol, timeframe = timeframe.as_str(), "News cache hit");
            return Ok(sentiment);
        }

        let Some(news) = &self.news_provider else {
            debug!(symbol = %symbol, "No news provider configured");
            return Ok(fallback::neutral_news_sentiment(&symbol, timeframe, Vec::new(), now));
        };

        let from = (now - timeframe.lookback()).date_naive();
        let to = now.date_naive();
        let articles = match news.company_news(&symbol, from, to).await {
            Ok(articles) => dedupe_articles(articles),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "News provider failed");
                return Ok(fallback::neutral_news_sentiment(&symbol, timeframe, Vec::new(), now));
            }
        };

        if articles.is_empty() {
            return Ok(fallback::empty_news_sentiment(&symbol, timeframe, now));
        }

        let Some(provider) = &self.narrative_provider else {
            return Ok(fallback::neutral_news_sentiment(&symbol, timeframe, articles, now));
        };

        let prompt = build_sentiment_prompt(&symbol, &articles);
        let reply = match provider.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Sentiment provider failed");
                return Ok(fallback::neutral_news_sentiment(&symbol, timeframe, articles, now));
            }
        };

        match parse_sentiment(&reply, &symbol, timeframe, articles.clone(), now) {
            Some(sentiment) => {
                self.news_cache.insert(key, sentiment.clone());
                Ok(sentiment)
            }
            None => {
                warn!(symbol = %symbol, "Unparseable sentiment reply");
                Ok(fallback::neutral_news_sentiment(&symbol, timeframe, articles, now))
            }
        }
    }
}

fn fallback_report(
    symbol: &str,
    source: NarrativeSource,
    at: chrono::DateTime<chrono::Utc>,
) -> NarrativeReport {
    let (analysis, note) = match source {
        NarrativeSource::FallbackUnparsed => (fallback::unparsed_analysis(symbol), None),
        _ => (
            fallback::unavailable_analysis(symbol),
            Some(fallback::FALLBACK_NOTE.to_string()),
        ),
    };
    NarrativeReport {
        ticker: symbol.to_string(),
        analysis,
        source,
        fallback: true,
        note,
        generated_at: at,
    }
}
