//! Market context — the point-in-time snapshot each analyst evaluates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fundamental metrics attached to a context when the data collaborator
/// has them. Absence is normal and downgrades fundamental-driven analysts
/// to Hold, never fails them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Trailing price/earnings ratio.
    pub pe_ratio: f64,
    /// Annual dividend yield as a fraction (0.02 = 2%).
    pub dividend_yield: f64,
}

/// Immutable point-in-time snapshot for one instrument.
///
/// Captured once per instrument per cycle by the market-data collaborator;
/// every analyst evaluating the instrument in that cycle sees this exact
/// snapshot, so their signals are mutually consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub symbol: String,
    /// Sector label copied from the instrument so sector-scoped analysts
    /// need no side lookup.
    pub sector: String,
    pub as_of: DateTime<Utc>,
    pub last_price: f64,
    pub volume: f64,
    /// Close history, oldest first; the final element equals `last_price`.
    pub closes: Vec<f64>,
    pub fundamentals: Option<Fundamentals>,
    /// News-sentiment score in [-1, 1], when available.
    pub sentiment: Option<f64>,
    /// Trailing benchmark (index) return over the same window, when available.
    pub benchmark_return: Option<f64>,
}

impl MarketContext {
    /// Number of closes available.
    pub fn history_len(&self) -> usize {
        self.closes.len()
    }

    /// Whether at least `n` closes are available.
    pub fn has_history(&self, n: usize) -> bool {
        self.closes.len() >= n
    }
}
