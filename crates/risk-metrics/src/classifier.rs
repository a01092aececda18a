use analysis_core::Signal;
use serde::{Deserialize, Serialize};

/// Strength above which the wide position bands (25/75) apply
pub const STRONG_SIGNAL_THRESHOLD: u8 = 65;
/// Strength above which the narrow position bands (15/85) apply
pub const MODERATE_SIGNAL_THRESHOLD: u8 = 35;
/// Absolute daily move, in percent, treated as an extreme move
pub const EXTREME_MOVE_PCT: f64 = 5.0;

/// Inputs to the classifier. `rsi` and `risk_score` travel with the decision
/// for reporting but do not gate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInputs {
    pub signal_strength: u8,
    /// Unclamped percent; `None` for an undefined (zero-width) range
    pub position_in_range: Option<f64>,
    pub rsi: f64,
    pub daily_change_percent: f64,
    pub risk_score: u8,
}

/// Which rule family wins when both produce a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// A daily move beyond ±5% decides the signal outright.
    #[default]
    ExtremeMoveFirst,
    /// Range rules decide; the extreme-move rule only breaks a HOLD.
    RangeFirst,
}

/// Classify with the default precedence (extreme move first).
pub fn classify(inputs: &SignalInputs) -> Signal {
    classify_with(inputs, Precedence::default())
}

pub fn classify_with(inputs: &SignalInputs, precedence: Precedence) -> Signal {
    let extreme = extreme_move_signal(inputs.daily_change_percent);
    let ranged = range_signal(inputs.signal_strength, inputs.position_in_range);

    match precedence {
        Precedence::ExtremeMoveFirst => extreme.unwrap_or(ranged),
        Precedence::RangeFirst => match ranged {
            Signal::Hold => extreme.unwrap_or(Signal::Hold),
            directional => directional,
        },
    }
}

/// Threshold rules over strength and position. All bounds are exclusive.
pub fn range_signal(signal_strength: u8, position_in_range: Option<f64>) -> Signal {
    let position = match position_in_range {
        Some(p) if p.is_finite() => p,
        _ => return Signal::Hold,
    };

    if signal_strength > STRONG_SIGNAL_THRESHOLD {
        if position < 25.0 {
            Signal::Buy
        } else if position > 75.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    } else if signal_strength > MODERATE_SIGNAL_THRESHOLD {
        if position < 15.0 {
            Signal::Buy
        } else if position > 85.0 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    } else {
        Signal::Hold
    }
}

/// BUY above +5%, SELL below -5%, otherwise no opinion.
pub fn extreme_move_signal(daily_change_percent: f64) -> Option<Signal> {
    if daily_change_percent > EXTREME_MOVE_PCT {
        Some(Signal::Buy)
    } else if daily_change_percent < -EXTREME_MOVE_PCT {
        Some(Signal::Sell)
    } else {
        None
    }
}
