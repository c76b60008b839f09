//! Market data seam.
//!
//! The orchestrator fetches one [`MarketContext`] per symbol per cycle
//! through this trait. A provider failing for one symbol degrades the
//! cycle for that symbol only; the rest proceed.

use async_trait::async_trait;
use fundlab_core::domain::MarketContext;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MarketDataError {
    #[error("market data unavailable for {symbol}: {cause}")]
    Unavailable { symbol: String, cause: String },
}

/// Source of per-symbol market context.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the current context for one symbol. Implementations must not
    /// panic; transient failure is reported as [`MarketDataError`].
    async fn fetch(&self, symbol: &str) -> Result<MarketContext, MarketDataError>;
}
