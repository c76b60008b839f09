//! Execution seam.
//!
//! Orders leave the decision core through this trait. A venue rejection is
//! a normal [`ExecutionReport::Rejected`] answer; [`ExecutionError`] is
//! reserved for transport-level failure where no answer arrived at all.

use async_trait::async_trait;
use fundlab_core::domain::{Fill, Order};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("execution adapter unreachable: {0}")]
    Unreachable(String),
}

/// The venue's answer for one submitted order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionReport {
    Filled(Fill),
    Rejected { reason: String },
}

/// Order submission seam; the paper broker is the default implementation.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Submit one order. `price_hint` is the decision-time price and is
    /// what a paper venue fills at.
    async fn submit(&self, order: &Order, price_hint: f64) -> Result<ExecutionReport, ExecutionError>;
}
