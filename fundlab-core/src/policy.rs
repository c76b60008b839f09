//! Trading policy — the named parameter set supplied at orchestrator
//! construction and immutable for the run.

use crate::analysts::default_roster_ids;
use crate::domain::AnalystId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy-level construction errors.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{field} must be within (0, 1], got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },

    #[error("max_open_positions must be at least 1")]
    NoPositionsAllowed,

    #[error("tie_break order must not be empty")]
    EmptyTieBreak,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

/// How the decision engine sizes a candidate order.
///
/// Serializable enum so run configs can pick a sizer by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderSizing {
    /// Notional = `base_fraction` × recommendation strength × equity,
    /// capped by available cash.
    StrengthScaled { base_fraction: f64 },

    /// Fixed notional per order, capped by available cash.
    FixedNotional { amount: f64 },

    /// Fixed share count per order.
    FixedShares { shares: u64 },
}

impl Default for OrderSizing {
    fn default() -> Self {
        OrderSizing::StrengthScaled { base_fraction: 0.10 }
    }
}

/// The full risk/decision parameter set for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TradingPolicy {
    /// Absolute cap on one position's market value, if any.
    pub max_position_value: Option<f64>,
    /// Cap on one position's value as a fraction of equity.
    pub max_position_pct: f64,
    /// Cap on one sector's exposure as a fraction of equity.
    pub max_sector_pct: f64,
    /// Maximum number of concurrent open positions.
    pub max_open_positions: usize,
    /// Recommendations below this strength are not traded.
    pub min_signal_strength: f64,
    /// Short selling: disabled by default, and the paper venue refuses
    /// shorts regardless.
    pub allow_short: bool,
    pub sizing: OrderSizing,
    /// Analyst priority order for aggregation tie-breaks.
    pub tie_break: Vec<AnalystId>,
    /// Per-analyst evaluation timeout.
    pub analyst_timeout_ms: u64,
    /// Whole-cycle execution deadline.
    pub cycle_deadline_ms: u64,
}

impl Default for TradingPolicy {
    fn default() -> Self {
        Self {
            max_position_value: None,
            max_position_pct: 0.05,
            max_sector_pct: 0.25,
            max_open_positions: 20,
            min_signal_strength: 0.55,
            allow_short: false,
            sizing: OrderSizing::default(),
            tie_break: default_roster_ids(),
            analyst_timeout_ms: 2_000,
            cycle_deadline_ms: 30_000,
        }
    }
}

impl TradingPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("max_position_pct", self.max_position_pct),
            ("max_sector_pct", self.max_sector_pct),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PolicyError::PercentOutOfRange { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.min_signal_strength) {
            return Err(PolicyError::PercentOutOfRange {
                field: "min_signal_strength",
                value: self.min_signal_strength,
            });
        }
        if self.max_open_positions == 0 {
            return Err(PolicyError::NoPositionsAllowed);
        }
        if self.tie_break.is_empty() {
            return Err(PolicyError::EmptyTieBreak);
        }
        if let Some(cap) = self.max_position_value {
            if cap <= 0.0 {
                return Err(PolicyError::NonPositive { field: "max_position_value", value: cap });
            }
        }
        match self.sizing {
            OrderSizing::StrengthScaled { base_fraction } if base_fraction <= 0.0 => {
                return Err(PolicyError::NonPositive {
                    field: "sizing.base_fraction",
                    value: base_fraction,
                });
            }
            OrderSizing::FixedNotional { amount } if amount <= 0.0 => {
                return Err(PolicyError::NonPositive { field: "sizing.amount", value: amount });
            }
            _ => {}
        }
        Ok(())
    }

    /// Per-instrument position-value cap given current equity: the tighter
    /// of the absolute and percentage limits.
    pub fn position_cap(&self, equity: f64) -> f64 {
        let pct_cap = self.max_position_pct * equity;
        match self.max_position_value {
            Some(abs) => abs.min(pct_cap),
            None => pct_cap,
        }
    }

    /// Deterministic fingerprint of the policy in force, recorded in every
    /// cycle record so audits can prove which parameters produced a trade.
    ///
    /// Infallible: every field is a scalar, string, or unit/struct enum
    /// variant, none of which can fail to encode as JSON, so the `expect`
    /// can only fire if a non-serializable field type is ever added.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("TradingPolicy serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
