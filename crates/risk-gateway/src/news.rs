use analysis_core::{NewsArticle, NewsSentiment, NewsTimeframe, TradingImplications};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

use crate::narrative::extract_json_object;

pub const MAX_ARTICLES: usize = 10;
const DEDUP_PREFIX_CHARS: usize = 50;

/// Drop near-duplicate headlines, newest first, at most `MAX_ARTICLES`.
///
/// Two articles are duplicates when the first 50 characters of their
/// lowercased titles match; the first one seen wins.
pub fn dedupe_articles(articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    let mut unique: Vec<NewsArticle> = articles
        .into_iter()
        .filter(|article| {
            let key: String = article
                .title
                .to_lowercase()
                .chars()
                .take(DEDUP_PREFIX_CHARS)
                .collect();
            seen.insert(key)
        })
        .collect();

    unique.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    unique.truncate(MAX_ARTICLES);
    unique
}

pub fn build_sentiment_prompt(symbol: &str, articles: &[NewsArticle]) -> String {
    let listing: String = articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            format!(
                "\n{}. **{}**\n   Source: {}\n   Date: {}\n   Summary: {}\n   URL: {}\n",
                i + 1,
                article.title,
                article.source,
                article.published_at.to_rfc3339(),
                article.description.as_deref().unwrap_or("No description available"),
                article.url,
            )
        })
        .collect();

    format!(
        r#"You are a financial sentiment analyst. Analyze the following news articles for {symbol} and provide a comprehensive sentiment assessment.

## NEWS ARTICLES:
{listing}

## ANALYSIS REQUIREMENTS:

Provide your analysis in this EXACT JSON format:

{{
  "overallScore": <number between -100 and 100>,
  "sentiment": "<bullish|neutral|bearish>",
  "confidence": <number between 0 and 100>,
  "summary": "<2-3 sentence summary of key sentiment drivers>",
  "keyThemes": ["<theme 1>", "<theme 2>", "<theme 3>"],
  "tradingImplications": {{
    "shortTerm": "<impact on stock in next 1-7 days>",
    "mediumTerm": "<impact on stock in next 1-4 weeks>",
    "keyRisks": ["<risk 1>", "<risk 2>"],
    "keyCatalysts": ["<catalyst 1>", "<catalyst 2>"]
  }},
  "recommendedAction": "<buy|hold|sell|monitor>"
}}

## SCORING GUIDELINES:
- +100: Extremely bullish (major positive catalysts)
- +50: Moderately bullish (several positive factors)
- 0: Neutral (mixed or no significant news)
- -50: Moderately bearish (several negative factors)
- -100: Extremely bearish (major negative catalysts)

Respond ONLY with the JSON object, no additional text."#
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentReply {
    overall_score: f64,
    sentiment: String,
    confidence: f64,
    summary: String,
    #[serde(default)]
    key_themes: Vec<String>,
    #[serde(default)]
    trading_implications: Option<TradingImplications>,
    #[serde(default)]
    recommended_action: Option<String>,
}

/// Parse the provider reply. Scores are clamped into their documented ranges.
pub fn parse_sentiment(
    text: &str,
    symbol: &str,
    timeframe: NewsTimeframe,
    articles: Vec<NewsArticle>,
    at: DateTime<Utc>,
) -> Option<NewsSentiment> {
    let json = extract_json_object(text)?;
    let reply: SentimentReply = match serde_json::from_str(json) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(symbol = %symbol, error = %e, "Sentiment JSON did not match schema");
            return None;
        }
    };

    if !reply.overall_score.is_finite() || !reply.confidence.is_finite() {
        return None;
    }

    Some(NewsSentiment {
        symbol: symbol.to_string(),
        timeframe,
        score: reply.overall_score.clamp(-100.0, 100.0).round() as i32,
        sentiment: reply.sentiment.to_lowercase(),
        confidence: reply.confidence.clamp(0.0, 100.0).round() as u8,
        summary: reply.summary,
        key_themes: reply.key_themes,
        trading_implications: reply.trading_implications,
        recommended_action: reply
            .recommended_action
            .map(|a| a.to_lowercase())
            .unwrap_or_else(|| "monitor".to_string()),
        articles,
        fallback: false,
        analyzed_at: at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(title: &str, hours_ago: i64) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: None,
            url: format!("https://news.example/{hours_ago}"),
            published_at: Utc::now() - Duration::hours(hours_ago),
            source: "Wire".to_string(),
        }
    }

    #[test]
    fn test_dedupe_by_title_prefix_and_sort() {
        let long = "Apple reports record quarterly revenue driven by services growth";
        let articles = vec![
            article("Older story", 10),
            article(long, 5),
            article(&long.to_uppercase(), 1),
            article("Newest story", 0),
        ];

        let unique = dedupe_articles(articles);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].title, "Newest story");
        assert_eq!(unique[1].title, long);
        assert_eq!(unique[2].title, "Older story");
    }

    #[test]
    fn test_dedupe_caps_at_ten() {
        let articles = (0..25).map(|i| article(&format!("Story {i}"), i)).collect();
        let unique = dedupe_articles(articles);
        assert_eq!(unique.len(), MAX_ARTICLES);
        assert_eq!(unique[0].title, "Story 0");
    }

    #[test]
    fn test_parse_sentiment_clamps() {
        let reply = r#"```json
        {"overallScore": 140, "sentiment": "Bullish", "confidence": 85.4,
         "summary": "Strong demand.", "keyThemes": ["AI"], "recommendedAction": "BUY"}
        ```"#;
        let parsed =
            parse_sentiment(reply, "NVDA", NewsTimeframe::Week, Vec::new(), Utc::now()).unwrap();
        assert_eq!(parsed.score, 100);
        assert_eq!(parsed.confidence, 85);
        assert_eq!(parsed.sentiment, "bullish");
        assert_eq!(parsed.recommended_action, "buy");
        assert!(!parsed.fallback);
    }

    #[test]
    fn test_parse_sentiment_rejects_bad_reply() {
        assert!(parse_sentiment("no idea", "X", NewsTimeframe::Day, Vec::new(), Utc::now()).is_none());
        assert!(parse_sentiment(
            r#"{"sentiment": "bullish"}"#,
            "X",
            NewsTimeframe::Day,
            Vec::new(),
            Utc::now()
        )
        .is_none());
    }

    #[test]
    fn test_prompt_lists_articles() {
        let prompt = build_sentiment_prompt("AAPL", &[article("Headline one", 1)]);
        assert!(prompt.contains("1. **Headline one**"));
        assert!(prompt.contains("Summary: No description available"));
        assert!(prompt.contains("\"overallScore\""));
    }
}
