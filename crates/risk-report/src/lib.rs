pub mod csv_export;
pub mod html_report;
pub mod summary;
pub mod text_report;

pub use csv_export::{rows_for, to_csv, ReportRow, CSV_HEADERS};
pub use summary::PortfolioSummary;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
