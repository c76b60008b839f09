//! Signals — one analyst's recommendation for one instrument in one cycle.
//!
//! Signals are immutable once emitted and retained verbatim in the cycle
//! audit record. They are portfolio-agnostic: an analyst sees only the
//! market context, never positions or cash.

use super::ids::AnalystId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommended action for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
            SignalAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// An immutable analyst recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub analyst: AnalystId,
    pub symbol: String,
    pub action: SignalAction,
    /// Conviction in [0, 1]; clamped at construction.
    pub confidence: f64,
    /// Human-readable reasoning, or the failure cause for downgraded holds.
    /// Annotation only — nothing downstream reads it back into a decision.
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        analyst: AnalystId,
        symbol: impl Into<String>,
        action: SignalAction,
        confidence: f64,
        rationale: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            analyst,
            symbol: symbol.into(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            timestamp,
        }
    }

    /// The downgrade signal for any internal analyst failure: Hold with
    /// zero confidence and the cause recorded in the rationale.
    pub fn hold(
        analyst: AnalystId,
        symbol: impl Into<String>,
        cause: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(analyst, symbol, SignalAction::Hold, 0.0, cause, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let ts = Utc::now();
        let hot = Signal::new(AnalystId::new("momentum-trader"), "SPY", SignalAction::Buy, 1.7, "x", ts);
        assert_eq!(hot.confidence, 1.0);
        let cold = Signal::new(AnalystId::new("momentum-trader"), "SPY", SignalAction::Sell, -0.3, "x", ts);
        assert_eq!(cold.confidence, 0.0);
    }

    #[test]
    fn hold_signal_carries_cause() {
        let s = Signal::hold(AnalystId::new("value-investor"), "SPY", "no fundamentals", Utc::now());
        assert_eq!(s.action, SignalAction::Hold);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.rationale, "no fundamentals");
    }

    #[test]
    fn serialization_roundtrip() {
        let s = Signal::new(
            AnalystId::new("technical-analyst"),
            "AAPL",
            SignalAction::Buy,
            0.72,
            "ma(10) above ma(30)",
            Utc::now(),
        );
        let json = serde_json::to_string(&s).unwrap();
        let de: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(de.analyst, s.analyst);
        assert_eq!(de.action, s.action);
        assert_eq!(de.confidence, s.confidence);
    }
}
