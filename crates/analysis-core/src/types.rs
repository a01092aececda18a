use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AnalysisError;

/// Normalize a user-supplied ticker: trim, uppercase, reject empty or odd characters.
pub fn normalize_symbol(raw: &str) -> Result<String, AnalysisError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidInput("Ticker symbol required".to_string()));
    }
    if symbol.len() > 12 {
        return Err(AnalysisError::InvalidInput(format!("Ticker symbol too long: {symbol}")));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(AnalysisError::InvalidInput(format!("Invalid ticker symbol: {symbol}")));
    }
    Ok(symbol)
}

/// Which path produced a quote. Downstream code treats both identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "Finnhub (Live)")]
    Live,
    #[serde(rename = "Demo Data (Fallback)")]
    Demo,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Live => "Finnhub (Live)",
            DataSource::Demo => "Demo Data (Fallback)",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSource::Demo)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw market snapshot for one ticker at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    /// Provider-supplied or estimated session volume
    #[serde(default)]
    pub volume: u64,
    /// Baseline used for the volume ratio; `None` means the ratio is neutral (1.0)
    #[serde(default)]
    pub average_volume: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64, previous_close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            previous_close,
            high: None,
            low: None,
            volume: 0,
            average_volume: None,
            timestamp: Utc::now(),
            data_source: DataSource::Live,
        }
    }

    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    pub fn with_volume(mut self, volume: u64, average_volume: Option<u64>) -> Self {
        self.volume = volume;
        self.average_volume = average_volume;
        self
    }

    pub fn with_source(mut self, source: DataSource) -> Self {
        self.data_source = source;
        self
    }

    /// Session (high, low) when both are present and form a non-degenerate range.
    pub fn day_range(&self) -> Option<(f64, f64)> {
        match (self.high, self.low) {
            (Some(high), Some(low)) if low > 0.0 && high > low => Some((high, low)),
            _ => None,
        }
    }

    /// Volume relative to its baseline, 1.0 when no baseline is known.
    pub fn volume_ratio(&self) -> f64 {
        match self.average_volume {
            Some(avg) if avg > 0 => self.volume as f64 / avg as f64,
            _ => 1.0,
        }
    }

    /// Reject inputs the metrics engine cannot handle (NaN, non-positive prices, inverted range).
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.symbol.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("Quote has no symbol".to_string()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: price must be positive, got {}",
                self.symbol, self.price
            )));
        }
        if !self.previous_close.is_finite() || self.previous_close < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: previous close must be non-negative, got {}",
                self.symbol, self.previous_close
            )));
        }
        if let (Some(high), Some(low)) = (self.high, self.low) {
            if !high.is_finite() || !low.is_finite() || high < low {
                return Err(AnalysisError::InvalidInput(format!(
                    "{}: invalid day range {low} - {high}",
                    self.symbol
                )));
            }
        }
        Ok(())
    }
}

/// Optional company enrichment. Missing fields fall back to neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub beta: f64,
    pub sector: String,
    /// Millions of USD, `None` renders as "N/A"
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            beta: 1.0,
            sector: "Unknown".to_string(),
            market_cap: None,
            name: None,
        }
    }
}

impl Profile {
    pub fn market_cap_label(&self) -> String {
        match self.market_cap {
            Some(cap) if cap >= 1_000_000.0 => format!("{:.2}T", cap / 1_000_000.0),
            Some(cap) if cap >= 1_000.0 => format!("{:.1}B", cap / 1_000.0),
            Some(cap) => format!("{cap:.0}M"),
            None => "N/A".to_string(),
        }
    }
}

/// Quote plus best-effort profile, as cached by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub quote: Quote,
    pub profile: Profile,
}

/// Trade signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volatility regime tier, in annualized percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolatilityRegime {
    /// Below 15%
    Low,
    /// 15% to 30% inclusive
    Normal,
    /// Above 30%
    High,
}

impl VolatilityRegime {
    pub fn from_volatility(volatility_pct: f64) -> Self {
        if volatility_pct < 15.0 {
            VolatilityRegime::Low
        } else if volatility_pct <= 30.0 {
            VolatilityRegime::Normal
        } else {
            VolatilityRegime::High
        }
    }

    /// Scale applied to range offsets
    pub fn multiplier(&self) -> f64 {
        match self {
            VolatilityRegime::Low => 0.7,
            VolatilityRegime::Normal => 1.0,
            VolatilityRegime::High => 1.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VolatilityRegime::Low => "LOW",
            VolatilityRegime::Normal => "NORMAL",
            VolatilityRegime::High => "HIGH",
        }
    }
}

/// A (low, high) price band. Not required to contain the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

impl PriceRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    /// Percent location of `price` between the bounds, unclamped.
    /// `None` when the range has no width.
    pub fn position_of(&self, price: f64) -> Option<f64> {
        let width = self.width();
        if !width.is_finite() || width.abs() < f64::EPSILON {
            return None;
        }
        Some((price - self.low) / width * 100.0)
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2} - ${:.2}", self.low, self.high)
    }
}

/// How the RSI value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSource {
    /// 14-period Wilder RSI over a close series
    Wilder,
    /// Momentum proxy derived from the daily change
    MomentumProxy,
}

/// Signal strength inputs, each on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalComponents {
    pub volume: f64,
    pub momentum: f64,
    pub inverse_volatility: f64,
    pub rsi_distance: f64,
}

/// Position sizing and exit levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlan {
    /// Percent of portfolio, 3-25
    pub position_size_pct: u8,
    pub stop_loss: f64,
    pub target: f64,
}

/// Everything the metrics engine derives from one quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub daily_change: f64,
    pub daily_change_percent: f64,
    /// Annualized percent
    pub volatility: f64,
    pub volatility_regime: VolatilityRegime,
    pub rsi: f64,
    pub rsi_source: RsiSource,
    pub beta: f64,
    pub risk_score: u8,
    pub short_term_range: PriceRange,
    pub medium_term_range: PriceRange,
    pub signal_strength: u8,
    pub signal_components: SignalComponents,
    /// Unclamped percent within `short_term_range`; `None` when the range has no width
    pub position_in_range: Option<f64>,
    pub signal: Signal,
    pub trade_plan: TradePlan,
}

impl DerivedMetrics {
    /// Position in range clamped to [0, 100] for display.
    pub fn position_in_range_display(&self) -> Option<f64> {
        self.position_in_range.map(|p| p.clamp(0.0, 100.0))
    }

    /// LOW / MODERATE / HIGH bucket of the risk score
    pub fn risk_level(&self) -> &'static str {
        if self.risk_score > 70 {
            "HIGH"
        } else if self.risk_score > 40 {
            "MODERATE"
        } else {
            "LOW"
        }
    }

    /// Overbought / oversold / neutral reading of the RSI
    pub fn rsi_condition(&self) -> &'static str {
        if self.rsi > 70.0 {
            "overbought"
        } else if self.rsi < 30.0 {
            "oversold"
        } else {
            "neutral"
        }
    }
}

/// Complete per-ticker result of the quote -> metrics -> signal pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAnalysis {
    pub symbol: String,
    pub quote: Quote,
    pub profile: Profile,
    pub metrics: DerivedMetrics,
    pub analyzed_at: DateTime<Utc>,
}

impl StockAnalysis {
    pub fn data_source(&self) -> DataSource {
        self.quote.data_source
    }
}

/// Money flow block of the narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyFlow {
    pub institutional: String,
    pub retail: String,
    pub insider_activity: String,
    pub options_flow: String,
    pub volume_analysis: String,
}

/// Sentiment block of the narrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBlock {
    pub overall: String,
    pub analyst_consensus: String,
    pub social_sentiment: String,
    pub positioning: String,
}

/// Structured narrative commentary for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub key_catalysts: Vec<String>,
    pub money_flow: MoneyFlow,
    pub recent_events: Vec<String>,
    pub sentiment: SentimentBlock,
}

impl AiAnalysis {
    /// All list fields populated and the overall sentiment label present.
    pub fn is_complete(&self) -> bool {
        !self.key_catalysts.is_empty()
            && !self.recent_events.is_empty()
            && self.key_catalysts.iter().all(|c| !c.trim().is_empty())
            && !self.sentiment.overall.trim().is_empty()
    }
}

/// Which path produced a narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Ai,
    /// Provider call failed or was not configured
    FallbackUnavailable,
    /// Provider answered but no valid JSON object could be extracted
    FallbackUnparsed,
}

impl NarrativeSource {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, NarrativeSource::Ai)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeReport {
    pub ticker: String,
    pub analysis: AiAnalysis,
    pub source: NarrativeSource,
    pub fallback: bool,
    #[serde(default)]
    pub note: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// News article from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

/// Lookback window for news sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NewsTimeframe {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl NewsTimeframe {
    /// Unknown values fall back to the 24h window.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "7d" => NewsTimeframe::Week,
            "30d" => NewsTimeframe::Month,
            _ => NewsTimeframe::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsTimeframe::Day => "24h",
            NewsTimeframe::Week => "7d",
            NewsTimeframe::Month => "30d",
        }
    }

    pub fn lookback(&self) -> Duration {
        match self {
            NewsTimeframe::Day => Duration::hours(24),
            NewsTimeframe::Week => Duration::days(7),
            NewsTimeframe::Month => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingImplications {
    pub short_term: String,
    pub medium_term: String,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub key_catalysts: Vec<String>,
}

/// Aggregated sentiment over recent news
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSentiment {
    pub symbol: String,
    pub timeframe: NewsTimeframe,
    /// -100 (very bearish) to 100 (very bullish)
    pub score: i32,
    pub sentiment: String,
    /// 0-100
    pub confidence: u8,
    pub summary: String,
    pub key_themes: Vec<String>,
    pub trading_implications: Option<TradingImplications>,
    pub recommended_action: String,
    pub articles: Vec<NewsArticle>,
    pub fallback: bool,
    pub analyzed_at: DateTime<Utc>,
}
