//! Locally synthesized payloads used when a provider fails.
//!
//! Every function here is infallible and deterministic for a given input, so
//! the gateway can always answer and repeated fallbacks agree with each other.

use analysis_core::{
    AiAnalysis, DataSource, MoneyFlow, NewsSentiment, NewsTimeframe, Profile, Quote,
    SentimentBlock, TradingImplications,
};
use chrono::{DateTime, Utc};
use risk_metrics::range_volatility_scale;

pub const FALLBACK_NOTE: &str = "Fallback analysis used due to temporary API unavailability";

/// (base price, annualized volatility %) for the demo universe
fn demo_baseline(symbol: &str) -> (f64, f64) {
    match symbol {
        "AAPL" => (175.0, 15.0),
        "MSFT" => (410.0, 25.0),
        "GOOGL" => (140.0, 12.0),
        "TSLA" => (240.0, 35.0),
        "NVDA" => (470.0, 40.0),
        _ => (150.0, 20.0),
    }
}

fn demo_beta(symbol: &str) -> f64 {
    match symbol {
        "AAPL" => 1.25,
        "MSFT" => 0.85,
        "GOOGL" => 1.1,
        "TSLA" => 2.1,
        "NVDA" => 1.8,
        _ => 1.0,
    }
}

/// FNV-1a over the symbol, salted per draw
fn symbol_hash(symbol: &str, salt: u8) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in symbol.bytes().chain(std::iter::once(salt)) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Deterministic value in [0, 1) derived from the symbol
fn unit(symbol: &str, salt: u8) -> f64 {
    (symbol_hash(symbol, salt) % 10_000) as f64 / 10_000.0
}

/// Demo quote for `symbol`, structurally identical to a live one.
///
/// The session range is sized so the metrics engine recovers roughly the
/// baseline volatility from it.
pub fn demo_quote(symbol: &str, at: DateTime<Utc>) -> Quote {
    let (base, volatility) = demo_baseline(symbol);

    let price = base + (unit(symbol, 1) - 0.5) * volatility;
    let change_pct = (unit(symbol, 2) - 0.5) * 10.0;
    let previous_close = price / (1.0 + change_pct / 100.0);

    let spread = volatility / 100.0 / range_volatility_scale();
    let high = price * (1.0 + spread / 2.0);
    let low = price * (1.0 - spread / 2.0);

    let volume = 30_000_000 + (unit(symbol, 3) * 20_000_000.0) as u64;

    let mut quote = Quote::new(symbol, price, previous_close)
        .with_range(high, low)
        .with_volume(volume, Some(40_000_000))
        .with_source(DataSource::Demo);
    quote.timestamp = at;
    quote
}

pub fn demo_profile(symbol: &str) -> Profile {
    let (base, _) = demo_baseline(symbol);
    Profile {
        beta: demo_beta(symbol),
        // ~16B shares outstanding, in millions of USD
        market_cap: Some(base * 16_000.0),
        ..Profile::default()
    }
}

/// Narrative used when the provider call fails or no provider is configured
pub fn unavailable_analysis(ticker: &str) -> AiAnalysis {
    AiAnalysis {
        key_catalysts: vec![
            format!("API temporarily unavailable - analyzing {ticker} with technical indicators"),
            "Monitor upcoming earnings announcements and guidance updates".to_string(),
            "Watch for sector rotation and institutional positioning changes".to_string(),
            "Technical levels suggest key support/resistance areas ahead".to_string(),
        ],
        money_flow: MoneyFlow {
            institutional: "Analysis pending - API connection issue".to_string(),
            retail: "Standard retail activity patterns observed".to_string(),
            insider_activity: "No recent insider activity detected".to_string(),
            options_flow: "Options flow data temporarily unavailable".to_string(),
            volume_analysis: format!("Volume patterns for {ticker} within normal ranges"),
        },
        recent_events: vec![
            "Real-time news analysis temporarily unavailable".to_string(),
            "Monitor financial news sources for latest developments".to_string(),
            "Check for recent analyst updates and price target changes".to_string(),
        ],
        sentiment: SentimentBlock {
            overall: "Neutral".to_string(),
            analyst_consensus: "Mixed analyst coverage - check latest reports".to_string(),
            social_sentiment: "Social sentiment data pending API restoration".to_string(),
            positioning: "Institutional positioning analysis in progress".to_string(),
        },
    }
}

/// Narrative used when the provider answered but no valid object could be extracted
pub fn unparsed_analysis(ticker: &str) -> AiAnalysis {
    AiAnalysis {
        key_catalysts: vec![
            format!("AI analysis indicates key catalysts for {ticker} based on current market conditions"),
            "Upcoming earnings and industry developments to monitor closely".to_string(),
            "Regulatory and policy implications for sector positioning and growth".to_string(),
            "Technical levels and volume patterns suggesting directional bias ahead".to_string(),
        ],
        money_flow: MoneyFlow {
            institutional: "Mixed institutional activity patterns observed".to_string(),
            retail: "Standard retail interest levels detected".to_string(),
            insider_activity: "No significant insider activity detected in recent period".to_string(),
            options_flow: "Options activity within normal ranges for current volatility".to_string(),
            volume_analysis: "Volume patterns suggest consolidation phase with potential for breakout"
                .to_string(),
        },
        recent_events: vec![
            "Recent market developments affecting sector positioning and relative performance"
                .to_string(),
            "Industry news and competitive landscape changes impacting valuation metrics".to_string(),
            "Broader market conditions influencing individual stock performance and sentiment"
                .to_string(),
        ],
        sentiment: SentimentBlock {
            overall: "Neutral".to_string(),
            analyst_consensus: "Mixed analyst views with standard coverage and price target distribution"
                .to_string(),
            social_sentiment: "Moderate social media interest with balanced retail sentiment".to_string(),
            positioning: "Institutional positioning appears balanced relative to benchmark allocations"
                .to_string(),
        },
    }
}

/// Neutral result for a symbol with no news in the window
pub fn empty_news_sentiment(
    symbol: &str,
    timeframe: NewsTimeframe,
    at: DateTime<Utc>,
) -> NewsSentiment {
    NewsSentiment {
        symbol: symbol.to_string(),
        timeframe,
        score: 0,
        sentiment: "neutral".to_string(),
        confidence: 0,
        summary: "No recent news available for analysis".to_string(),
        key_themes: Vec::new(),
        trading_implications: None,
        recommended_action: "monitor".to_string(),
        articles: Vec::new(),
        fallback: false,
        analyzed_at: at,
    }
}

/// Neutral result when the news or sentiment provider fails
pub fn neutral_news_sentiment(
    symbol: &str,
    timeframe: NewsTimeframe,
    articles: Vec<analysis_core::NewsArticle>,
    at: DateTime<Utc>,
) -> NewsSentiment {
    let unavailable = || vec!["Analysis unavailable".to_string()];
    NewsSentiment {
        symbol: symbol.to_string(),
        timeframe,
        score: 0,
        sentiment: "neutral".to_string(),
        confidence: 30,
        summary: "Unable to analyze sentiment with AI. Manual review recommended.".to_string(),
        key_themes: unavailable(),
        trading_implications: Some(TradingImplications {
            short_term: "Uncertain due to analysis failure".to_string(),
            medium_term: "Uncertain due to analysis failure".to_string(),
            key_risks: unavailable(),
            key_catalysts: unavailable(),
        }),
        recommended_action: "monitor".to_string(),
        articles,
        fallback: true,
        analyzed_at: at,
    }
}
