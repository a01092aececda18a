use analysis_core::{
    DerivedMetrics, PriceRange, Profile, Quote, RsiSource, Signal, SignalComponents, TradePlan,
    VolatilityRegime,
};

use crate::classifier::{classify_with, Precedence, SignalInputs};
use crate::indicators::{latest_rsi, RSI_PERIOD};

const TRADING_DAYS: f64 = 252.0;

/// Baseline annualized market volatility (percent) used when no day range is known
pub const MARKET_BASE_VOLATILITY: f64 = 16.0;

/// Percent of RSI displacement per percent of daily change
pub const RSI_PROXY_SCALE: f64 = 4.0;

pub const RISK_BASE: f64 = 40.0;
pub const RISK_VOLATILITY_CAP: f64 = 25.0;

const SHORT_TERM_DAYS: f64 = 5.0;
const MEDIUM_TERM_DAYS: f64 = 21.0;
const DOWNSIDE_WEIGHT: f64 = 0.8;
const UPSIDE_WEIGHT: f64 = 1.2;
const SHORT_TERM_DRIFT: f64 = 0.5;
const MEDIUM_TERM_DRIFT: f64 = 1.0;
/// Drift is capped at a quarter of the price so the anchor stays positive
const MAX_DRIFT_FRACTION: f64 = 0.25;
/// Smallest band half-width, as a fraction of price
const MIN_BAND_FRACTION: f64 = 0.001;

const VOLUME_WEIGHT: f64 = 0.30;
const MOMENTUM_WEIGHT: f64 = 0.25;
const INVERSE_VOLATILITY_WEIGHT: f64 = 0.20;
const RSI_DISTANCE_WEIGHT: f64 = 0.25;

/// Scale from (high - low) / price to annualized volatility: sqrt(252) / (2 * sqrt(ln 2)).
pub fn range_volatility_scale() -> f64 {
    TRADING_DAYS.sqrt() / (2.0 * std::f64::consts::LN_2.sqrt())
}

/// (price - previous close, percent change). Both are 0 when there is no
/// positive previous close.
pub fn daily_change(price: f64, previous_close: f64) -> (f64, f64) {
    if previous_close <= 0.0 || !previous_close.is_finite() {
        return (0.0, 0.0);
    }
    let change = price - previous_close;
    (change, change / previous_close * 100.0)
}

/// Annualized volatility in percent.
///
/// Uses the session high/low spread when available, otherwise beta and the
/// size of today's move. The range path scales by `range_volatility_scale()`
/// (about 9.53), so any spread above roughly 2.62% of price already reaches
/// the 25 point volatility cap in `risk_score`.
pub fn volatility_estimate(quote: &Quote, beta: f64, daily_change_percent: f64) -> f64 {
    let estimate = match quote.day_range() {
        Some((high, low)) => (high - low) / quote.price * 100.0 * range_volatility_scale(),
        None => beta.abs() * MARKET_BASE_VOLATILITY + daily_change_percent.abs() * 2.0,
    };
    if estimate.is_finite() {
        estimate.max(0.0)
    } else {
        0.0
    }
}

/// Momentum oscillator in [0, 100] used when no close history is available.
pub fn rsi_proxy(daily_change_percent: f64) -> f64 {
    (50.0 + daily_change_percent * RSI_PROXY_SCALE).clamp(0.0, 100.0)
}

/// Composite 0-100 risk score.
pub fn risk_score(volatility: f64, beta: f64, rsi: f64, daily_change_percent: f64) -> u8 {
    let mut score = RISK_BASE;
    score += finite_or_zero(volatility).clamp(0.0, RISK_VOLATILITY_CAP);
    score += finite_or_zero((beta - 1.0).abs() * 15.0);
    if rsi > 70.0 {
        score += 15.0;
    } else if rsi < 30.0 {
        score -= 10.0;
    }
    if daily_change_percent.abs() > 5.0 {
        score += 10.0;
    }
    clamp_score(score)
}

/// Short-term (5 session) and medium-term (21 session) ranges.
///
/// Each band is anchored on the price shifted by part of today's move, with a
/// smaller downside than upside offset, so the current price may fall outside.
pub fn price_ranges(price: f64, daily_change: f64, volatility: f64) -> (PriceRange, PriceRange) {
    let regime = VolatilityRegime::from_volatility(volatility);
    let daily_sigma = volatility / 100.0 / TRADING_DAYS.sqrt();
    let max_drift = price * MAX_DRIFT_FRACTION;
    let drift = daily_change.clamp(-max_drift, max_drift);

    let band = |days: f64, drift_factor: f64| {
        let half_width =
            (price * daily_sigma * days.sqrt() * regime.multiplier()).max(price * MIN_BAND_FRACTION);
        let anchor = price + drift * drift_factor;
        PriceRange::new(
            (anchor - half_width * DOWNSIDE_WEIGHT).max(0.0),
            anchor + half_width * UPSIDE_WEIGHT,
        )
    };

    (
        band(SHORT_TERM_DAYS, SHORT_TERM_DRIFT),
        band(MEDIUM_TERM_DAYS, MEDIUM_TERM_DRIFT),
    )
}

/// Unclamped percent position of `price` in `range`; `None` for a zero-width range.
pub fn position_in_range(price: f64, range: &PriceRange) -> Option<f64> {
    range.position_of(price)
}

/// Weighted 0-100 conviction score and its components.
pub fn signal_strength(
    volume_ratio: f64,
    daily_change_percent: f64,
    volatility: f64,
    rsi: f64,
) -> (u8, SignalComponents) {
    let components = SignalComponents {
        volume: finite_or_zero(volume_ratio / 2.0 * 100.0).clamp(0.0, 100.0),
        momentum: finite_or_zero(daily_change_percent.abs() / 5.0 * 100.0).min(100.0),
        inverse_volatility: finite_or_zero(100.0 - volatility * 2.0).clamp(0.0, 100.0),
        rsi_distance: finite_or_zero((rsi - 50.0).abs() * 2.0).min(100.0),
    };

    let total = components.volume * VOLUME_WEIGHT
        + components.momentum * MOMENTUM_WEIGHT
        + components.inverse_volatility * INVERSE_VOLATILITY_WEIGHT
        + components.rsi_distance * RSI_DISTANCE_WEIGHT;

    (clamp_score(total), components)
}

/// Position size, stop loss and target for a signal.
pub fn trade_plan(price: f64, risk_score: u8, signal: Signal) -> TradePlan {
    let position_size_pct = (28.0 - risk_score as f64 / 3.5).clamp(3.0, 25.0).round() as u8;
    let (stop_loss, target) = match signal {
        Signal::Buy => (price * 0.94, price * 1.12),
        Signal::Sell | Signal::Hold => (price * 1.06, price * 0.88),
    };
    TradePlan {
        position_size_pct,
        stop_loss,
        target,
    }
}

fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Metrics engine
///
/// Stateless apart from the classifier precedence. Inputs must already be
/// validated (`Quote::validate`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine {
    precedence: Precedence,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precedence(precedence: Precedence) -> Self {
        Self { precedence }
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    pub fn compute(&self, quote: &Quote, profile: Option<&Profile>) -> DerivedMetrics {
        self.compute_inner(quote, profile, None)
    }

    /// Like `compute`, but uses a real 14-period RSI when enough closes are given.
    pub fn compute_with_history(
        &self,
        quote: &Quote,
        profile: Option<&Profile>,
        closes: &[f64],
    ) -> DerivedMetrics {
        self.compute_inner(quote, profile, latest_rsi(closes, RSI_PERIOD))
    }

    fn compute_inner(
        &self,
        quote: &Quote,
        profile: Option<&Profile>,
        historical_rsi: Option<f64>,
    ) -> DerivedMetrics {
        let beta = profile
            .map(|p| p.beta)
            .filter(|b| b.is_finite())
            .unwrap_or(1.0);

        let (change, change_pct) = daily_change(quote.price, quote.previous_close);
        let volatility = volatility_estimate(quote, beta, change_pct);
        let volatility_regime = VolatilityRegime::from_volatility(volatility);

        let (rsi, rsi_source) = match historical_rsi {
            Some(value) => (value, RsiSource::Wilder),
            None => (rsi_proxy(change_pct), RsiSource::MomentumProxy),
        };

        let risk = risk_score(volatility, beta, rsi, change_pct);
        let (short_term_range, medium_term_range) = price_ranges(quote.price, change, volatility);
        let position = position_in_range(quote.price, &short_term_range);
        let (strength, components) =
            signal_strength(quote.volume_ratio(), change_pct, volatility, rsi);

        let signal = classify_with(
            &SignalInputs {
                signal_strength: strength,
                position_in_range: position,
                rsi,
                daily_change_percent: change_pct,
                risk_score: risk,
            },
            self.precedence,
        );

        DerivedMetrics {
            daily_change: change,
            daily_change_percent: change_pct,
            volatility,
            volatility_regime,
            rsi,
            rsi_source,
            beta,
            risk_score: risk,
            short_term_range,
            medium_term_range,
            signal_strength: strength,
            signal_components: components,
            position_in_range: position,
            signal,
            trade_plan: trade_plan(quote.price, risk, signal),
        }
    }
}

/// Compute metrics with the default engine.
pub fn compute_metrics(quote: &Quote, profile: Option<&Profile>) -> DerivedMetrics {
    MetricsEngine::new().compute(quote, profile)
}

/// Compute metrics with the default engine, using `closes` for RSI when long enough.
pub fn compute_metrics_with_history(
    quote: &Quote,
    profile: Option<&Profile>,
    closes: &[f64],
) -> DerivedMetrics {
    MetricsEngine::new().compute_with_history(quote, profile, closes)
}
