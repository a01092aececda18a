use analysis_core::{Signal, StockAnalysis};
use serde::Serialize;

/// Aggregate view over a batch of analyses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub count: usize,
    /// 0 when the batch is empty
    pub average_risk_score: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub hold_count: usize,
    /// Tickers whose risk score is above 70
    pub high_risk: Vec<String>,
    /// Tickers analyzed from fallback data
    pub fallback_tickers: Vec<String>,
}

impl PortfolioSummary {
    pub fn from_analyses(analyses: &[StockAnalysis]) -> Self {
        let count = analyses.len();
        let average_risk_score = if count == 0 {
            0.0
        } else {
            analyses
                .iter()
                .map(|a| a.metrics.risk_score as f64)
                .sum::<f64>()
                / count as f64
        };

        let signals = |signal: Signal| analyses.iter().filter(|a| a.metrics.signal == signal).count();

        Self {
            count,
            average_risk_score,
            buy_count: signals(Signal::Buy),
            sell_count: signals(Signal::Sell),
            hold_count: signals(Signal::Hold),
            high_risk: analyses
                .iter()
                .filter(|a| a.metrics.risk_level() == "HIGH")
                .map(|a| a.symbol.clone())
                .collect(),
            fallback_tickers: analyses
                .iter()
                .filter(|a| a.data_source().is_fallback())
                .map(|a| a.symbol.clone())
                .collect(),
        }
    }
}
