use analysis_core::{NewsSentiment, NewsTimeframe};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct NewsSentimentRequest {
    pub symbol: Option<String>,
    /// `24h`, `7d` or `30d`; anything else means `24h`
    #[serde(default)]
    pub timeframe: Option<String>,
}

pub fn news_routes() -> Router<AppState> {
    Router::new().route("/api/news-sentiment", post(news_sentiment))
}

async fn news_sentiment(
    State(state): State<AppState>,
    Json(request): Json<NewsSentimentRequest>,
) -> Result<Json<ApiResponse<NewsSentiment>>, AppError> {
    let symbol = request
        .symbol
        .ok_or_else(|| AppError::bad_request("Symbol is required"))?;
    let timeframe = request
        .timeframe
        .as_deref()
        .map(NewsTimeframe::parse)
        .unwrap_or_default();

    let sentiment = state
        .gateway
        .get_news_sentiment(&symbol, timeframe)
        .await
        .map_err(AppError::from_analysis)?;

    Ok(Json(ApiResponse::success(sentiment)))
}
