use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Client configuration: {0}")]
    Configuration(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RequestFailed(e) if e.is_decode() => {
                AnalysisError::MalformedPayload(e.to_string())
            }
            LlmError::RequestFailed(e) => AnalysisError::ProviderUnavailable(e.to_string()),
            LlmError::ServiceUnavailable(msg) => AnalysisError::ProviderUnavailable(msg),
            LlmError::Timeout => AnalysisError::ProviderUnavailable("LLM request timed out".to_string()),
            LlmError::InvalidResponse(msg) => AnalysisError::MalformedPayload(msg),
            LlmError::Serialization(e) => AnalysisError::MalformedPayload(e.to_string()),
            LlmError::Configuration(msg) => AnalysisError::Configuration(msg),
        }
    }
}
