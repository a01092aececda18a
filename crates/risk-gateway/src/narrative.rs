use analysis_core::{AiAnalysis, DerivedMetrics, Signal};

/// Build the narrative prompt, embedding the computed metrics as context.
pub fn build_prompt(ticker: &str, price: f64, metrics: &DerivedMetrics, signal: Signal) -> String {
    format!(
        r#"Analyze {ticker} stock for a professional investment report. Based on current market conditions, provide:

1. KEY CATALYSTS (3-4 most important near-term factors):
   - Upcoming earnings/events with specific dates if known
   - Industry developments affecting the sector
   - Regulatory changes or policy impacts
   - Product launches or major business announcements

2. MONEY FLOW ANALYSIS:
   - Institutional vs retail activity patterns
   - Recent insider trading activity (last 30 days)
   - Options flow and sentiment indicators
   - Volume patterns and what they indicate

3. IMPACTFUL RECENT EVENTS/NEWS (Last 30 days):
   - Major news developments affecting stock price
   - Analyst upgrades/downgrades with price targets
   - Management changes or guidance updates
   - Sector rotation impacts and peer comparisons

4. SENTIMENT ANALYSIS:
   - Overall market sentiment (bullish/bearish/neutral)
   - Social media and retail investor sentiment
   - Analyst consensus changes and positioning
   - Institutional positioning relative to peers

Current technical data for context:
- Current Price: ${price:.2}
- Daily Change: {change:.2}%
- RSI: {rsi:.1}
- Beta: {beta:.2}
- Volatility: {volatility:.1}%
- Risk Score: {risk}/100
- Current Signal: {signal}

Please provide specific, actionable insights formatted as JSON with this structure:
{{
  "keyCatalysts": ["catalyst1", "catalyst2", "catalyst3", "catalyst4"],
  "moneyFlow": {{
    "institutional": "accumulation/distribution/neutral",
    "retail": "buying/selling/neutral",
    "insiderActivity": "description of recent insider activity",
    "optionsFlow": "description of options sentiment",
    "volumeAnalysis": "analysis of volume patterns"
  }},
  "recentEvents": ["event1", "event2", "event3"],
  "sentiment": {{
    "overall": "Bullish/Bearish/Neutral/Mixed",
    "analystConsensus": "description of analyst views",
    "socialSentiment": "description of social/retail sentiment",
    "positioning": "description of institutional positioning"
  }}
}}

Focus on concrete, recent information that could impact price movement in the next 1-3 months."#,
        change = metrics.daily_change_percent,
        rsi = metrics.rsi,
        beta = metrics.beta,
        volatility = metrics.volatility,
        risk = metrics.risk_score,
    )
}

/// First balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not count
/// towards the balance. Returns `None` when no object closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the provider reply into a complete `AiAnalysis`.
pub fn parse_analysis(text: &str) -> Option<AiAnalysis> {
    let json = extract_json_object(text)?;
    match serde_json::from_str::<AiAnalysis>(json) {
        Ok(analysis) if analysis.is_complete() => Some(analysis),
        Ok(_) => {
            tracing::debug!("Narrative JSON parsed but incomplete");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Narrative JSON did not match schema");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_metrics::compute_metrics;
    use analysis_core::Quote;

    const VALID: &str = r#"{
        "keyCatalysts": ["Q3 earnings", "New product {launch}", "Buyback", "Index inclusion"],
        "moneyFlow": {
            "institutional": "accumulation",
            "retail": "buying",
            "insiderActivity": "minor \"planned\" sales",
            "optionsFlow": "call skew",
            "volumeAnalysis": "rising"
        },
        "recentEvents": ["Upgrade", "Guidance raise", "Partnership"],
        "sentiment": {
            "overall": "Bullish",
            "analystConsensus": "Buy",
            "socialSentiment": "Positive",
            "positioning": "Overweight"
        }
    }"#;

    #[test]
    fn test_extracts_object_with_surrounding_prose() {
        let text = format!("Sure! Here is the analysis:\n{VALID}\nLet me know {{if}} you need more.");
        let json = extract_json_object(&text).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert_eq!(json, VALID);
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"x {"a": "}{", "b": {"c": "\"}"}} trailing }"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": "}{", "b": {"c": "\"}"}}"#)
        );
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ unterminated"), None);
        assert_eq!(extract_json_object("} before {"), None);
    }

    #[test]
    fn test_parse_analysis() {
        let parsed = parse_analysis(&format!("Analysis: {VALID}")).unwrap();
        assert_eq!(parsed.sentiment.overall, "Bullish");
        assert_eq!(parsed.money_flow.insider_activity, "minor \"planned\" sales");

        assert!(parse_analysis(r#"{"keyCatalysts": []}"#).is_none());
        assert!(parse_analysis("I cannot help with that").is_none());
    }

    #[test]
    fn test_prompt_embeds_metrics() {
        let quote = Quote::new("AAPL", 100.0, 95.0).with_range(105.0, 95.0);
        let metrics = compute_metrics(&quote, None);
        let prompt = build_prompt("AAPL", 100.0, &metrics, metrics.signal);

        assert!(prompt.starts_with("Analyze AAPL stock"));
        assert!(prompt.contains("- Current Price: $100.00"));
        assert!(prompt.contains("- Daily Change: 5.26%"));
        assert!(prompt.contains("- Current Signal: BUY"));
        assert!(prompt.contains("\"keyCatalysts\""));
    }
}
