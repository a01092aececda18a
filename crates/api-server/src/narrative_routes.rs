use analysis_core::{NarrativeReport, StockAnalysis};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeRequest {
    pub ticker: Option<String>,
    /// A previous `/api/stock-data` result; re-analyzed when absent
    #[serde(default)]
    pub stock_data: Option<StockAnalysis>,
}

pub fn narrative_routes() -> Router<AppState> {
    Router::new().route("/api/claude-analysis", post(claude_analysis))
}

async fn claude_analysis(
    State(state): State<AppState>,
    Json(request): Json<NarrativeRequest>,
) -> Result<Json<ApiResponse<NarrativeReport>>, AppError> {
    let ticker = request
        .ticker
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing required parameter: ticker"))?;

    let analysis = match request.stock_data {
        Some(data) if data.symbol.eq_ignore_ascii_case(ticker.trim()) => data,
        _ => state
            .gateway
            .analyze(&ticker)
            .await
            .map_err(AppError::from_analysis)?,
    };

    let report = state
        .gateway
        .get_narrative(&ticker, analysis.quote.price, &analysis.metrics)
        .await
        .map_err(AppError::from_analysis)?;

    Ok(Json(ApiResponse::success(report)))
}
