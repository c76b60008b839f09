//! Cycle records — the immutable audit trail of one trading cycle.
//!
//! A cycle always runs to completion. Partial failure never aborts it;
//! instead the record is flagged `degraded` and every contributing cause
//! is listed, so a reader can reconstruct exactly what did and did not
//! happen from the record alone.

use crate::aggregate::AggregatedRecommendation;
use crate::decision::DecisionRecord;
use crate::domain::{AnalystId, CycleId, Fill, Order, OrderId, OrderStatus, PortfolioSnapshot, ReconciliationError, Signal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phases a cycle moves through, in order. Recorded for observability;
/// the orchestrator never skips or revisits a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Gathering,
    Aggregating,
    Deciding,
    Executing,
    Reconciling,
    Complete,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CyclePhase::Gathering => "gathering",
            CyclePhase::Aggregating => "aggregating",
            CyclePhase::Deciding => "deciding",
            CyclePhase::Executing => "executing",
            CyclePhase::Reconciling => "reconciling",
            CyclePhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// One cause of a degraded cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DegradedReason {
    /// An analyst panicked or timed out; its signal was downgraded to Hold.
    AnalystFailure { analyst: AnalystId, symbol: String, cause: String },
    /// Market data could not be fetched for a symbol this cycle.
    DataUnavailable { symbol: String },
    /// The execution adapter did not answer before the cycle deadline.
    ExecutionTimeout { order_id: OrderId },
    /// The execution adapter answered with a transport-level failure.
    ExecutionFailure { order_id: OrderId, cause: String },
    /// A fill contradicted portfolio state; the symbol is now blocked.
    Reconciliation { symbol: String, cause: ReconciliationError },
    /// The audit sink refused the record; trading state is unaffected.
    AuditFailure { cause: String },
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::AnalystFailure { analyst, symbol, cause } => {
                write!(f, "analyst {analyst} failed on {symbol}: {cause}")
            }
            DegradedReason::DataUnavailable { symbol } => {
                write!(f, "market data unavailable for {symbol}")
            }
            DegradedReason::ExecutionTimeout { order_id } => {
                write!(f, "execution timed out for order {order_id}")
            }
            DegradedReason::ExecutionFailure { order_id, cause } => {
                write!(f, "execution failed for order {order_id}: {cause}")
            }
            DegradedReason::Reconciliation { symbol, cause } => {
                write!(f, "reconciliation failed for {symbol}: {cause}")
            }
            DegradedReason::AuditFailure { cause } => {
                write!(f, "audit append failed: {cause}")
            }
        }
    }
}

/// Terminal status of one submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Everything one cycle produced, in phase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: CycleId,
    /// Phase reached when the record was written. Always `Complete`: a
    /// cycle never stops early, however degraded it got on the way.
    pub phase: CyclePhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Fingerprint of the policy in force, so replays can detect drift.
    pub policy_fingerprint: String,
    pub degraded: bool,
    pub degraded_reasons: Vec<DegradedReason>,
    pub signals: Vec<Signal>,
    pub recommendations: Vec<AggregatedRecommendation>,
    pub decisions: Vec<DecisionRecord>,
    pub orders: Vec<Order>,
    pub executions: Vec<ExecutionOutcome>,
    pub fills: Vec<Fill>,
    pub snapshot: PortfolioSnapshot,
}

impl CycleRecord {
    /// Fills the venue reported this cycle. Reconciliation may still have
    /// refused some of them; refusals appear in `degraded_reasons`.
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_reasons_render_with_context() {
        let r = DegradedReason::AnalystFailure {
            analyst: AnalystId::new("macro-economist"),
            symbol: "SPY".into(),
            cause: "timed out after 2000ms".into(),
        };
        assert_eq!(
            r.to_string(),
            "analyst macro-economist failed on SPY: timed out after 2000ms"
        );

        let r = DegradedReason::ExecutionTimeout { order_id: OrderId::new("c4-2") };
        assert_eq!(r.to_string(), "execution timed out for order c4-2");
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(CyclePhase::Gathering.to_string(), "gathering");
        assert_eq!(CyclePhase::Complete.to_string(), "complete");
    }
}
