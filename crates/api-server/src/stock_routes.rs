use analysis_core::StockAnalysis;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use risk_gateway::ProviderStatus;
use risk_report::PortfolioSummary;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct StockQuery {
    pub ticker: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct AnalyzeAllRequest {
    /// Falls back to the watchlist when absent or empty
    #[serde(default)]
    pub tickers: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: ProviderStatus,
    pub watchlist_size: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub analyses: Vec<StockAnalysis>,
    pub summary: PortfolioSummary,
    pub requested: usize,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stock-data", get(get_stock_data))
        .route("/api/analyze-all", post(analyze_all))
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy",
        providers: state.gateway.provider_status(),
        watchlist_size: state.watchlist.len().await,
        timestamp: Utc::now(),
    }))
}

/// Quote, derived metrics and signal for one ticker
async fn get_stock_data(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> Result<Json<ApiResponse<StockAnalysis>>, AppError> {
    let ticker = query
        .ticker
        .ok_or_else(|| AppError::bad_request("Ticker symbol required"))?;

    let analysis = state
        .gateway
        .analyze(&ticker)
        .await
        .map_err(AppError::from_analysis)?;

    Ok(Json(ApiResponse::success(analysis)))
}

/// Sequential batch over the given tickers or the watchlist
async fn analyze_all(
    State(state): State<AppState>,
    body: Option<Json<AnalyzeAllRequest>>,
) -> Result<Json<ApiResponse<BatchResponse>>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let tickers = match request.tickers {
        Some(tickers) if !tickers.is_empty() => tickers,
        _ => state.watchlist.list().await,
    };

    let analyses = state.gateway.analyze_all(&tickers).await;
    let summary = PortfolioSummary::from_analyses(&analyses);

    tracing::info!(
        requested = tickers.len(),
        analyzed = analyses.len(),
        "Batch analysis complete"
    );

    Ok(Json(ApiResponse::success(BatchResponse {
        requested: tickers.len(),
        analyses,
        summary,
    })))
}
