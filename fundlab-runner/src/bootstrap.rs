//! Portfolio bootstrap from the audit trail.
//!
//! A new session resumes from the latest snapshot in the audit sink when
//! one exists, otherwise starts fresh with the configured capital. Open
//! orders are never carried across sessions; a snapshot is taken after
//! reconciliation, so anything unresolved was already cancelled.

use fundlab_core::domain::PortfolioState;
use log::info;

use crate::audit::{AuditError, AuditSink};

pub fn bootstrap_portfolio(
    sink: &dyn AuditSink,
    initial_capital: f64,
) -> Result<PortfolioState, AuditError> {
    match sink.latest_snapshot()? {
        Some(snapshot) => {
            info!(
                "resuming from snapshot: cash {:.2}, {} positions, equity {:.2}",
                snapshot.cash,
                snapshot.positions.len(),
                snapshot.equity
            );
            Ok(PortfolioState::from_snapshot(&snapshot))
        }
        None => {
            info!("no prior snapshot; starting fresh with {initial_capital:.2}");
            Ok(PortfolioState::new(initial_capital))
        }
    }
}
