use analysis_core::StockAnalysis;

use crate::ReportError;

pub const CSV_HEADERS: [&str; 9] = [
    "Ticker",
    "Current Price",
    "Daily Change %",
    "RSI",
    "Beta",
    "Signal",
    "Risk Score",
    "Position Size %",
    "Data Source",
];

/// One exported line: a watchlist ticker and its analysis, if any
#[derive(Debug, Clone, Copy)]
pub struct ReportRow<'a> {
    pub ticker: &'a str,
    pub analysis: Option<&'a StockAnalysis>,
}

/// Pair every ticker with its analysis, preserving ticker order.
pub fn rows_for<'a>(tickers: &'a [String], analyses: &'a [StockAnalysis]) -> Vec<ReportRow<'a>> {
    tickers
        .iter()
        .map(|ticker| ReportRow {
            ticker,
            analysis: analyses.iter().find(|a| a.symbol.eq_ignore_ascii_case(ticker)),
        })
        .collect()
}

fn record(row: &ReportRow<'_>) -> Vec<String> {
    let Some(a) = row.analysis else {
        let mut fields = vec![row.ticker.to_string(), "No Data".to_string()];
        fields.resize(CSV_HEADERS.len(), String::new());
        return fields;
    };

    vec![
        a.symbol.clone(),
        format!("{:.2}", a.quote.price),
        format!("{:.2}", a.metrics.daily_change_percent),
        format!("{:.1}", a.metrics.rsi),
        format!("{:.2}", a.metrics.beta),
        a.metrics.signal.to_string(),
        a.metrics.risk_score.to_string(),
        a.metrics.trade_plan.position_size_pct.to_string(),
        a.data_source().label().to_string(),
    ]
}

pub fn to_csv(rows: &[ReportRow<'_>]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.write_record(record(row))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

/// `stock_analysis_YYYY-MM-DD.csv`
pub fn export_filename(date: chrono::NaiveDate) -> String {
    format!("stock_analysis_{}.csv", date.format("%Y-%m-%d"))
}
