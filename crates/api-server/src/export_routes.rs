use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use risk_report::{csv_export, html_report, rows_for, text_report, to_csv};
use serde::Deserialize;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct ExportQuery {
    /// Comma separated; defaults to the watchlist
    pub tickers: Option<String>,
}

#[derive(Deserialize)]
pub struct HtmlReportQuery {
    #[serde(default)]
    pub narrative: bool,
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/api/export/csv", get(export_csv))
        .route("/api/report/:ticker", get(text_report_handler))
        .route("/api/report/:ticker/html", get(html_report_handler))
}

async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let tickers: Vec<String> = match query.tickers.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => state.watchlist.list().await,
    };

    let analyses = state.gateway.analyze_all(&tickers).await;
    let body = to_csv(&rows_for(&tickers, &analyses))?;
    let filename = csv_export::export_filename(Utc::now().date_naive());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

async fn text_report_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Response, AppError> {
    let analysis = state
        .gateway
        .analyze(&ticker)
        .await
        .map_err(AppError::from_analysis)?;

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        text_report::full_report(&analysis),
    )
        .into_response())
}

async fn html_report_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<HtmlReportQuery>,
) -> Result<Html<String>, AppError> {
    let analysis = state
        .gateway
        .analyze(&ticker)
        .await
        .map_err(AppError::from_analysis)?;

    let narrative = if query.narrative {
        Some(
            state
                .gateway
                .get_narrative(&analysis.symbol, analysis.quote.price, &analysis.metrics)
                .await
                .map_err(AppError::from_analysis)?,
        )
    } else {
        None
    };

    Ok(Html(html_report::render(&analysis, narrative.as_ref())))
}
