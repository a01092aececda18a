#[cfg(test)]
mod tests {
    use crate::*;
    use analysis_core::{
        AnalysisError, DataSource, DerivedMetrics, NarrativeProvider, NarrativeSource, NewsArticle,
        NewsProvider, NewsTimeframe, Profile, Quote, QuoteProvider, RsiSource, Signal,
    };
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;
    use risk_metrics::{compute_metrics, RSI_PERIOD};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeQuotes {
        quote_calls: AtomicUsize,
        profile_calls: AtomicUsize,
        fail: bool,
    }

    impl FakeQuotes {
        fn healthy() -> Arc<Self> {
            Arc::new(Self {
                quote_calls: AtomicUsize::new(0),
                profile_calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                quote_calls: AtomicUsize::new(0),
                profile_calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeQuotes {
        async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::ProviderUnavailable("HTTP 500".to_string()));
            }
            Ok(Quote::new(symbol, 100.0, 95.0)
                .with_range(105.0, 95.0)
                .with_volume(1_000_000, None))
        }

        async fn fetch_profile(&self, _symbol: &str) -> Result<Profile, AnalysisError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::ProviderUnavailable("HTTP 500".to_string()));
            }
            Ok(Profile {
                beta: 1.2,
                sector: "Technology".to_string(),
                ..Profile::default()
            })
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    /// Returns a fixed reply, or a provider failure when `reply` is `None`
    struct FakeNarrator {
        calls: AtomicUsize,
        reply: Option<String>,
    }

    impl FakeNarrator {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: Some(reply.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: None,
            })
        }
    }

    #[async_trait]
    impl NarrativeProvider for FakeNarrator {
        async fn complete(&self, _prompt: &str) -> Result<String, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| AnalysisError::ProviderUnavailable("HTTP 500".to_string()))
        }

        fn provider_name(&self) -> &'static str {
            "fake-llm"
        }
    }

    struct FakeNews {
        calls: AtomicUsize,
        articles: Vec<NewsArticle>,
    }

    #[async_trait]
    impl NewsProvider for FakeNews {
        async fn company_news(
            &self,
            _symbol: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<NewsArticle>, AnalysisError> {
            assert!(from <= to);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.articles.clone())
        }
    }

    const NARRATIVE_JSON: &str = r#"Here is my analysis:
    {
        "keyCatalysts": ["Earnings", "Product cycle", "Buyback", "Rates"],
        "moneyFlow": {
            "institutional": "accumulation",
            "retail": "neutral",
            "insiderActivity": "none",
            "optionsFlow": "balanced",
            "volumeAnalysis": "average"
        },
        "recentEvents": ["Upgrade", "Conference", "Dividend"],
        "sentiment": {
            "overall": "Bullish",
            "analystConsensus": "Buy",
            "socialSentiment": "Positive",
            "positioning": "Overweight"
        }
    }"#;

    const SENTIMENT_JSON: &str = r#"{"overallScore": 42, "sentiment": "bullish", "confidence": 70,
        "summary": "Demand is strong.", "keyThemes": ["Demand"], "recommendedAction": "hold"}"#;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()))
    }

    fn gateway(
        quotes: Option<Arc<FakeQuotes>>,
        narrator: Option<Arc<FakeNarrator>>,
        news: Option<Arc<FakeNews>>,
        clock: Arc<ManualClock>,
    ) -> RiskGateway {
        RiskGateway::new(
            quotes.map(|q| q as Arc<dyn QuoteProvider>),
            narrator.map(|n| n as Arc<dyn NarrativeProvider>),
            news.map(|n| n as Arc<dyn NewsProvider>),
            GatewayConfig::default(),
        )
        .with_clock(clock)
    }

    #[tokio::test]
    async fn test_quote_cache_hit_then_expiry() {
        let quotes = FakeQuotes::healthy();
        let clock = manual_clock();
        let gw = gateway(Some(quotes.clone()), None, None, clock.clone());

        let first = gw.get_quote("aapl").await.unwrap();
        let second = gw.get_quote("AAPL").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(quotes.quote_calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::seconds(61));
        gw.get_quote("AAPL").await.unwrap();
        assert_eq!(quotes.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_demo_quote() {
        let quotes = FakeQuotes::failing();
        let gw = gateway(Some(quotes.clone()), None, None, manual_clock());

        let quote = gw.get_quote("TSLA").await.unwrap();
        assert_eq!(quote.data_source, DataSource::Demo);
        assert_eq!(quote.symbol, "TSLA");
        assert!(quote.validate().is_ok());

        // Fallback payloads are not cached
        gw.get_quote("TSLA").await.unwrap();
        assert_eq!(quotes.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_symbol_is_rejected_without_provider_call() {
        let quotes = FakeQuotes::healthy();
        let gw = gateway(Some(quotes.clone()), None, None, manual_clock());

        let err = gw.get_quote("   ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert_eq!(quotes.quote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_demo_mode_without_provider() {
        let gw = gateway(None, None, None, manual_clock());
        let snapshot = gw.get_market_snapshot("NVDA").await.unwrap();
        assert!(snapshot.quote.data_source.is_fallback());
        assert_eq!(snapshot.profile.beta, 1.8);
        assert_eq!(gw.provider_status(), ProviderStatus { quotes: false, narrative: false, news: false });
    }

    #[tokio::test]
    async fn test_analyze_matches_reference_metrics() {
        let quotes = FakeQuotes::healthy();
        let gw = gateway(Some(quotes.clone()), None, None, manual_clock());
        let analysis = gw.analyze("AAPL").await.unwrap();
        gw.analyze("AAPL").await.unwrap();
        assert_eq!(quotes.profile_calls.load(Ordering::SeqCst), 1);

        assert_eq!(analysis.data_source(), DataSource::Live);
        assert_eq!(analysis.profile.sector, "Technology");
        assert_eq!(analysis.metrics.risk_score, 93);
        assert_eq!(analysis.metrics.signal, Signal::Buy);
    }

    #[tokio::test]
    async fn test_profile_failure_keeps_live_quote() {
        let quotes = FakeQuotes::healthy();
        struct NoProfile(Arc<FakeQuotes>);

        #[async_trait]
        impl QuoteProvider for NoProfile {
            async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
                self.0.fetch_quote(symbol).await
            }
            async fn fetch_profile(&self, _symbol: &str) -> Result<Profile, AnalysisError> {
                Err(AnalysisError::MalformedPayload("bad json".to_string()))
            }
            fn provider_name(&self) -> &'static str {
                "no-profile"
            }
        }

        let gw = RiskGateway::new(
            Some(Arc::new(NoProfile(quotes))),
            None,
            None,
            GatewayConfig::default(),
        );
        let snapshot = gw.get_market_snapshot("AAPL").await.unwrap();
        assert_eq!(snapshot.quote.data_source, DataSource::Live);
        assert_eq!(snapshot.profile, Profile::default());
    }

    #[tokio::test]
    async fn test_analyze_all_skips_invalid_symbols() {
        let quotes = FakeQuotes::healthy();
        let gw = gateway(Some(quotes.clone()), None, None, manual_clock());

        let symbols = vec!["AAPL".to_string(), "".to_string(), "bad symbol".to_string(), "MSFT".to_string()];
        let results = gw.analyze_all(&symbols).await;

        let tickers: Vec<&str> = results.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(quotes.quote_calls.load(Ordering::SeqCst), 2);
    }

    fn reference_metrics() -> DerivedMetrics {
        let quote = Quote::new("AAPL", 100.0, 95.0).with_range(105.0, 95.0);
        compute_metrics(&quote, None)
    }

    #[tokio::test]
    async fn test_narrative_cached_within_window() {
        let narrator = FakeNarrator::replying(NARRATIVE_JSON);
        let clock = manual_clock();
        let gw = gateway(None, Some(narrator.clone()), None, clock.clone());
        let metrics = reference_metrics();

        let first = gw.get_narrative("AAPL", 100.0, &metrics).await.unwrap();
        assert_eq!(first.source, NarrativeSource::Ai);
        assert!(!first.fallback);
        assert_eq!(first.analysis.sentiment.overall, "Bullish");

        clock.advance(Duration::minutes(2));
        gw.get_narrative("AAPL", 100.0, &metrics).await.unwrap();
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 1);

        // Next 5-minute window
        clock.advance(Duration::minutes(4));
        gw.get_narrative("AAPL", 100.0, &metrics).await.unwrap();
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_narrative_provider_failure_uses_template() {
        let narrator = FakeNarrator::failing();
        let gw = gateway(None, Some(narrator.clone()), None, manual_clock());

        let report = gw.get_narrative("MSFT", 100.0, &reference_metrics()).await.unwrap();
        assert!(report.fallback);
        assert_eq!(report.source, NarrativeSource::FallbackUnavailable);
        assert!(report.note.is_some());
        assert!(report.analysis.is_complete());

        gw.get_narrative("MSFT", 100.0, &reference_metrics()).await.unwrap();
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_narrative_without_json_uses_unparsed_template() {
        let narrator = FakeNarrator::replying("I'm sorry, I can't provide that.");
        let gw = gateway(None, Some(narrator), None, manual_clock());

        let report = gw.get_narrative("MSFT", 100.0, &reference_metrics()).await.unwrap();
        assert!(report.fallback);
        assert_eq!(report.source, NarrativeSource::FallbackUnparsed);
        assert_eq!(report.analysis, fallback::unparsed_analysis("MSFT"));
    }

    #[tokio::test]
    async fn test_narrative_rejects_empty_ticker() {
        let gw = gateway(None, None, None, manual_clock());
        let err = gw.get_narrative("", 100.0, &reference_metrics()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    fn news_article(title: &str) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: Some("summary".to_string()),
            url: "https://news.example".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            source: "Wire".to_string(),
        }
    }

    #[tokio::test]
    async fn test_news_sentiment_cached_per_timeframe() {
        let news = Arc::new(FakeNews {
            calls: AtomicUsize::new(0),
            articles: vec![news_article("Beat and raise"), news_article("BEAT AND RAISE")],
        });
        let narrator = FakeNarrator::replying(SENTIMENT_JSON);
        let gw = gateway(None, Some(narrator.clone()), Some(news.clone()), manual_clock());

        let result = gw.get_news_sentiment("AAPL", NewsTimeframe::Day).await.unwrap();
        assert_eq!(result.score, 42);
        assert_eq!(result.articles.len(), 1);
        assert!(!result.fallback);

        gw.get_news_sentiment("AAPL", NewsTimeframe::Day).await.unwrap();
        assert_eq!(news.calls.load(Ordering::SeqCst), 1);

        gw.get_news_sentiment("AAPL", NewsTimeframe::Week).await.unwrap();
        assert_eq!(news.calls.load(Ordering::SeqCst), 2);
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_news_sentiment_without_articles() {
        let news = Arc::new(FakeNews {
            calls: AtomicUsize::new(0),
            articles: Vec::new(),
        });
        let narrator = FakeNarrator::replying(SENTIMENT_JSON);
        let gw = gateway(None, Some(narrator.clone()), Some(news), manual_clock());

        let result = gw.get_news_sentiment("AAPL", NewsTimeframe::Day).await.unwrap();
        assert_eq!(result.summary, "No recent news available for analysis");
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_news_sentiment_llm_failure_is_neutral_fallback() {
        let news = Arc::new(FakeNews {
            calls: AtomicUsize::new(0),
            articles: vec![news_article("Guidance cut")],
        });
        let gw = gateway(None, Some(FakeNarrator::failing()), Some(news.clone()), manual_clock());

        let result = gw.get_news_sentiment("AAPL", NewsTimeframe::Month).await.unwrap();
        assert!(result.fallback);
        assert_eq!(result.score, 0);
        assert_eq!(result.articles.len(), 1);

        gw.get_news_sentiment("AAPL", NewsTimeframe::Month).await.unwrap();
        assert_eq!(news.calls.load(Ordering::SeqCst), 2);
    }

    /// Each fetch returns a price one dollar above the previous one
    struct RisingQuotes {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for RisingQuotes {
        async fn fetch_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
            let price = 100.0 + n;
            Ok(Quote::new(symbol, price, price - 1.0).with_range(price + 1.0, price - 2.0))
        }

        async fn fetch_profile(&self, _symbol: &str) -> Result<Profile, AnalysisError> {
            Ok(Profile::default())
        }

        fn provider_name(&self) -> &'static str {
            "rising"
        }
    }

    #[tokio::test]
    async fn test_repeated_live_quotes_switch_to_wilder_rsi() {
        let quotes = Arc::new(RisingQuotes {
            calls: AtomicUsize::new(0),
        });
        let clock = manual_clock();
        let gw = RiskGateway::new(
            Some(quotes.clone() as Arc<dyn QuoteProvider>),
            None,
            None,
            GatewayConfig::default(),
        )
        .with_clock(clock.clone());

        for _ in 0..RSI_PERIOD {
            let analysis = gw.analyze("MSFT").await.unwrap();
            assert_eq!(analysis.metrics.rsi_source, RsiSource::MomentumProxy);
            clock.advance(Duration::seconds(61));
        }

        let analysis = gw.analyze("MSFT").await.unwrap();
        assert_eq!(quotes.calls.load(Ordering::SeqCst), RSI_PERIOD + 1);
        assert_eq!(gw.close_history("MSFT").len(), RSI_PERIOD + 1);
        assert_eq!(analysis.metrics.rsi_source, RsiSource::Wilder);
        // Every close is a gain
        assert_eq!(analysis.metrics.rsi, 100.0);

        // A cache hit adds no point
        gw.analyze("MSFT").await.unwrap();
        assert_eq!(gw.close_history("MSFT").len(), RSI_PERIOD + 1);
    }

    #[tokio::test]
    async fn test_close_history_is_bounded() {
        let quotes = Arc::new(RisingQuotes {
            calls: AtomicUsize::new(0),
        });
        let clock = manual_clock();
        let config = GatewayConfig {
            close_history_len: 20,
            ..GatewayConfig::default()
        };
        let gw = RiskGateway::new(Some(quotes as Arc<dyn QuoteProvider>), None, None, config)
            .with_clock(clock.clone());

        for _ in 0..30 {
            gw.get_quote("MSFT").await.unwrap();
            clock.advance(Duration::seconds(61));
        }

        let history = gw.close_history("MSFT");
        assert_eq!(history.len(), 20);
        assert_eq!(history.first().copied(), Some(110.0));
        assert_eq!(history.last().copied(), Some(129.0));
    }

    #[tokio::test]
    async fn test_demo_quotes_never_enter_close_history() {
        let gw = gateway(Some(FakeQuotes::failing()), None, None, manual_clock());
        let analysis = gw.analyze("TSLA").await.unwrap();
        assert!(analysis.data_source().is_fallback());
        assert!(gw.close_history("TSLA").is_empty());
    }
}
