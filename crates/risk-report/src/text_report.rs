use analysis_core::{Signal, StockAnalysis};

fn positioning(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "potential upside opportunity",
        Signal::Sell => "profit-taking consideration",
        Signal::Hold => "neutral positioning with monitoring advised",
    }
}

fn entry_strategy(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "Consider gradual accumulation",
        Signal::Sell => "Consider position reduction",
        Signal::Hold => "Hold current allocation",
    }
}

/// Markdown risk-range report for one ticker.
pub fn full_report(analysis: &StockAnalysis) -> String {
    let m = &analysis.metrics;
    let sign = if m.daily_change_percent > 0.0 { "+" } else { "" };
    let movement = if m.volatility > 30.0 { "high" } else { "moderate" };
    let position = m
        .position_in_range_display()
        .map(|p| format!("{p:.0}% of the short-term range"))
        .unwrap_or_else(|| "undefined (flat range)".to_string());

    format!(
        "# Comprehensive Risk Range Analysis for {ticker}

## Executive Summary
Current Signal: **{signal}** (Strength: {strength}/100)
Risk Assessment: **{risk_level}** risk profile

## Current Market Position
- **Price**: ${price:.2} ({sign}{change:.2}% today)
- **Technical Status**: RSI at {rsi:.1} indicates {rsi_condition} conditions
- **Volatility**: {volatility:.1}% ({regime} regime) suggests {movement} price movement potential
- **Beta**: {beta:.2}

## Risk Range Analysis
**Short-term Trading Range**: {short}
**Medium-term Investment Range**: {medium}
**Position in Range**: {position}

The current price positioning suggests {positioning}.

## Recommendations
- **Position Size**: {size}% of portfolio maximum
- **Entry Strategy**: {entry}
- **Risk Management**: Stop loss at ${stop:.2}, target at ${target:.2}

*Analysis generated using market data from {source}*
",
        ticker = analysis.symbol,
        signal = m.signal,
        strength = m.signal_strength,
        risk_level = m.risk_level(),
        price = analysis.quote.price,
        change = m.daily_change_percent,
        rsi = m.rsi,
        rsi_condition = m.rsi_condition(),
        volatility = m.volatility,
        regime = m.volatility_regime.label(),
        beta = m.beta,
        short = m.short_term_range,
        medium = m.medium_term_range,
        positioning = positioning(m.signal),
        size = m.trade_plan.position_size_pct,
        entry = entry_strategy(m.signal),
        stop = m.trade_plan.stop_loss,
        target = m.trade_plan.target,
        source = analysis.data_source(),
    )
}
