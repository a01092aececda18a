use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Rejected request: missing or malformed ticker, non-positive price, etc.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-2xx response, network failure or timeout.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Unparseable body, missing required field or zero price.
    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    /// True for the failures that the gateway recovers from with fallback data.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::ProviderUnavailable(_) | AnalysisError::MalformedPayload(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_kinds() {
        assert!(AnalysisError::ProviderUnavailable("HTTP 500".into()).is_provider_failure());
        assert!(AnalysisError::MalformedPayload("zero price".into()).is_provider_failure());
        assert!(!AnalysisError::InvalidInput("empty ticker".into()).is_provider_failure());
        assert!(!AnalysisError::Configuration("no key".into()).is_provider_failure());
    }
}
