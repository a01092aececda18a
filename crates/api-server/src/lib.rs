pub mod config;
pub mod watchlist;

mod export_routes;
mod narrative_routes;
mod news_routes;
mod stock_routes;
mod watchlist_routes;


use analysis_core::AnalysisError;
use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use finnhub_client::FinnhubClient;
use llm_client::ClaudeClient;
use risk_gateway::RiskGateway;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::AppConfig;
pub use watchlist::Watchlist;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RiskGateway>,
    pub watchlist: Arc<Watchlist>,
}

impl AppState {
    pub fn new(gateway: RiskGateway, watchlist: Watchlist) -> Self {
        Self {
            gateway: Arc::new(gateway),
            watchlist: Arc::new(watchlist),
        }
    }

    /// Wire providers from configuration. Missing keys leave that path in fallback mode.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let finnhub = match &config.finnhub_api_key {
            Some(key) => Some(Arc::new(
                FinnhubClient::with_base_url(
                    key.clone(),
                    config.finnhub_base_url.clone(),
                    config.provider_timeout,
                )
                .context("Failed to build Finnhub client")?,
            )),
            None => {
                tracing::warn!("FINNHUB_API_KEY not set, serving demo data");
                None
            }
        };

        let claude = match &config.claude_api_key {
            Some(key) => Some(Arc::new(
                ClaudeClient::new(
                    key.clone(),
                    config.claude_model.clone(),
                    config.claude_max_tokens,
                    config.claude_base_url.clone(),
                    config.provider_timeout,
                )
                .context("Failed to build Claude client")?,
            )),
            None => {
                tracing::warn!("CLAUDE_API_KEY not set, narratives use fallback templates");
                None
            }
        };

        let gateway = RiskGateway::new(
            finnhub.clone().map(|c| c as Arc<dyn analysis_core::QuoteProvider>),
            claude.map(|c| c as Arc<dyn analysis_core::NarrativeProvider>),
            finnhub.map(|c| c as Arc<dyn analysis_core::NewsProvider>),
            config.gateway_config(),
        );

        Ok(Self::new(gateway, Watchlist::new(config.default_watchlist.clone())))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying its HTTP status
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
    }

    /// `InvalidInput` is the caller's fault; everything else is ours.
    pub fn from_analysis(err: AnalysisError) -> Self {
        let status = match err {
            AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, err.into())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "Request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.error, "Request rejected");
        }
        (self.status, Json(ApiResponse::<()>::error(self.error.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(stock_routes::stock_routes())
        .merge(narrative_routes::narrative_routes())
        .merge(news_routes::news_routes())
        .merge(watchlist_routes::watchlist_routes())
        .merge(export_routes::export_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "Risk range API listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
