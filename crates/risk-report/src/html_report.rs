use analysis_core::{NarrativeReport, Signal, StockAnalysis};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn signal_color(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "#22c55e",
        Signal::Sell => "#ef4444",
        Signal::Hold => "#eab308",
    }
}

fn row(label: &str, value: &str, shaded: bool) -> String {
    let style = if shaded { r#" style="background:#f8fafc;""# } else { "" };
    format!(
        r#"  <tr{style}><td style="padding:8px 12px;color:#94a3b8;">{label}</td><td style="padding:8px 12px;font-weight:600;">{value}</td></tr>"#
    )
}

fn list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect::<Vec<_>>()
        .join("")
}

fn narrative_section(report: &NarrativeReport) -> String {
    let a = &report.analysis;
    let note = report
        .note
        .as_deref()
        .map(|n| format!(r#"<p style="color:#f97316;margin:0 0 8px;">{}</p>"#, escape_html(n)))
        .unwrap_or_default();

    format!(
        r#"<div style="padding:16px 20px;border-top:1px solid #e2e8f0;">
  <h2 style="font-size:16px;margin:0 0 8px;">Market Intelligence</h2>
  {note}
  <h3 style="font-size:14px;">Key Catalysts</h3>
  <ul>{catalysts}</ul>
  <h3 style="font-size:14px;">Money Flow</h3>
  <ul><li>Institutional: {institutional}</li><li>Retail: {retail}</li><li>Insider activity: {insider}</li><li>Options flow: {options}</li><li>Volume: {volume}</li></ul>
  <h3 style="font-size:14px;">Recent Events</h3>
  <ul>{events}</ul>
  <h3 style="font-size:14px;">Sentiment: {overall}</h3>
  <ul><li>Analysts: {analysts}</li><li>Social: {social}</li><li>Positioning: {positioning}</li></ul>
</div>"#,
        catalysts = list(&a.key_catalysts),
        institutional = escape_html(&a.money_flow.institutional),
        retail = escape_html(&a.money_flow.retail),
        insider = escape_html(&a.money_flow.insider_activity),
        options = escape_html(&a.money_flow.options_flow),
        volume = escape_html(&a.money_flow.volume_analysis),
        events = list(&a.recent_events),
        overall = escape_html(&a.sentiment.overall),
        analysts = escape_html(&a.sentiment.analyst_consensus),
        social = escape_html(&a.sentiment.social_sentiment),
        positioning = escape_html(&a.sentiment.positioning),
    )
}

/// Standalone HTML report for one ticker, optionally with narrative commentary.
pub fn render(analysis: &StockAnalysis, narrative: Option<&NarrativeReport>) -> String {
    let m = &analysis.metrics;
    let ticker = escape_html(&analysis.symbol);
    let color = signal_color(m.signal);

    let rows = [
        row("Price", &format!("${:.2}", analysis.quote.price), false),
        row("Daily Change", &format!("{:+.2}%", m.daily_change_percent), true),
        row("RSI", &format!("{:.1} ({})", m.rsi, m.rsi_condition()), false),
        row("Beta", &format!("{:.2}", m.beta), true),
        row(
            "Volatility",
            &format!("{:.1}% ({})", m.volatility, m.volatility_regime.label()),
            false,
        ),
        row("Risk Score", &format!("{}/100 ({})", m.risk_score, m.risk_level()), true),
        row("Signal Strength", &format!("{}/100", m.signal_strength), false),
        row("Short-term Range", &m.short_term_range.to_string(), true),
        row("Medium-term Range", &m.medium_term_range.to_string(), false),
        row("Position Size", &format!("{}%", m.trade_plan.position_size_pct), true),
        row("Stop Loss", &format!("${:.2}", m.trade_plan.stop_loss), false),
        row("Target", &format!("${:.2}", m.trade_plan.target), true),
        row("Sector", &escape_html(&analysis.profile.sector), false),
        row("Market Cap", &analysis.profile.market_cap_label(), true),
    ]
    .join("\n");

    let narrative_html = narrative.map(narrative_section).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{ticker} Risk Report</title></head>
<body style="margin:0;padding:32px 0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<div style="max-width:600px;margin:0 auto;background:#ffffff;border-radius:8px;overflow:hidden;">
<div style="background:{color};color:#fff;padding:12px 20px;font-size:18px;font-weight:700;">{signal} {ticker}</div>
<table style="width:100%;border-collapse:collapse;">
{rows}
</table>
{narrative_html}
<p style="padding:16px 20px;margin:0;color:#94a3b8;font-size:12px;">Data source: {source} &middot; Generated {generated} UTC</p>
</div>
</body>
</html>
"#,
        signal = m.signal,
        source = escape_html(analysis.data_source().label()),
        generated = analysis.analyzed_at.format("%Y-%m-%d %H:%M:%S"),
    )
}
