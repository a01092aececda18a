//! Watchlist management

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct AddTickerRequest {
    pub ticker: String,
}

pub fn watchlist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/watchlist", get(get_watchlist).post(add_ticker))
        .route("/api/watchlist/:ticker", delete(remove_ticker))
}

async fn get_watchlist(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.watchlist.list().await))
}

async fn add_ticker(
    State(state): State<AppState>,
    Json(request): Json<AddTickerRequest>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let added = state
        .watchlist
        .add(&request.ticker)
        .await
        .map_err(AppError::from_analysis)?;
    if added {
        tracing::info!(ticker = %request.ticker, "Added to watchlist");
    }
    Ok(Json(ApiResponse::success(state.watchlist.list().await)))
}

async fn remove_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let removed = state
        .watchlist
        .remove(&ticker)
        .await
        .map_err(AppError::from_analysis)?;
    if !removed {
        return Err(AppError::not_found(format!("{} is not on the watchlist", ticker.to_uppercase())));
    }
    Ok(Json(ApiResponse::success(state.watchlist.list().await)))
}
