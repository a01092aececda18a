use analysis_core::{normalize_symbol, AnalysisError};
use tokio::sync::RwLock;

/// Ordered, de-duplicated list of uppercase tickers
#[derive(Debug, Default)]
pub struct Watchlist {
    tickers: RwLock<Vec<String>>,
}

impl Watchlist {
    /// Seed from configuration. Invalid or repeated entries are dropped.
    pub fn new(seed: Vec<String>) -> Self {
        let mut tickers: Vec<String> = Vec::with_capacity(seed.len());
        for raw in seed {
            match normalize_symbol(&raw) {
                Ok(symbol) if !tickers.contains(&symbol) => tickers.push(symbol),
                Ok(_) => {}
                Err(e) => tracing::warn!(ticker = %raw, error = %e, "Ignoring watchlist seed entry"),
            }
        }
        Self {
            tickers: RwLock::new(tickers),
        }
    }

    pub async fn list(&self) -> Vec<String> {
        self.tickers.read().await.clone()
    }

    /// Returns whether the ticker was newly added.
    pub async fn add(&self, raw: &str) -> Result<bool, AnalysisError> {
        let symbol = normalize_symbol(raw)?;
        let mut tickers = self.tickers.write().await;
        if tickers.contains(&symbol) {
            return Ok(false);
        }
        tickers.push(symbol);
        Ok(true)
    }

    /// Returns whether the ticker was present.
    pub async fn remove(&self, raw: &str) -> Result<bool, AnalysisError> {
        let symbol = normalize_symbol(raw)?;
        let mut tickers = self.tickers.write().await;
        let before = tickers.len();
        tickers.retain(|t| t != &symbol);
        Ok(tickers.len() != before)
    }

    pub async fn len(&self) -> usize {
        self.tickers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_normalized_and_deduplicated() {
        let list = Watchlist::new(vec!["aapl".into(), "AAPL".into(), " msft ".into(), "".into()]);
        assert_eq!(list.list().await, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let list = Watchlist::new(vec!["AAPL".into()]);
        assert!(list.add("nvda").await.unwrap());
        assert!(!list.add("NVDA").await.unwrap());
        assert_eq!(list.list().await, vec!["AAPL", "NVDA"]);

        assert!(list.remove("aapl").await.unwrap());
        assert!(!list.remove("AAPL").await.unwrap());
        assert_eq!(list.len().await, 1);

        assert!(matches!(list.add("  ").await, Err(AnalysisError::InvalidInput(_))));
    }
}
