//! Analyst strategies — eight independent decision procedures behind one trait.
//!
//! Analysts are portfolio-agnostic and total: `evaluate` always returns a
//! signal, downgrading to Hold with zero confidence on any internal
//! inability (insufficient history, missing fundamentals) instead of
//! erroring. Shared helper math lives in [`math`] as standalone pure
//! functions, not base-type state.

pub mod growth;
pub mod macro_econ;
pub mod math;
pub mod momentum;
pub mod risk_manager;
pub mod sector;
pub mod sentiment;
pub mod technical;
pub mod value;

pub use growth::GrowthHunter;
pub use macro_econ::MacroEconomist;
pub use momentum::MomentumTrader;
pub use risk_manager::RiskManager;
pub use sector::SectorSpecialist;
pub use sentiment::SentimentAnalyzer;
pub use technical::TechnicalAnalyst;
pub use value::ValueInvestor;

use crate::domain::{AnalystId, MarketContext, Signal};

/// One analyst decision procedure.
///
/// # Architecture invariant
/// `evaluate` receives only the market context. Portfolio state never
/// reaches an analyst, so evaluations for different instruments and
/// different analysts are mutually independent and safely re-entrant.
pub trait Analyst: Send + Sync {
    /// Stable kebab-case identifier (e.g. "risk-manager").
    fn id(&self) -> AnalystId;

    /// Produce this analyst's signal for the given snapshot. Total: any
    /// internal failure is expressed as a zero-confidence Hold.
    fn evaluate(&self, ctx: &MarketContext) -> Signal;
}

/// The full roster in canonical priority order (risk manager first).
///
/// This order doubles as the default aggregation tie-break: when two
/// actions receive equal weighted votes, the earliest-ranked analyst
/// voting for one of them decides.
pub fn default_roster() -> Vec<Box<dyn Analyst>> {
    vec![
        Box::new(RiskManager::default()),
        Box::new(ValueInvestor::default()),
        Box::new(GrowthHunter::default()),
        Box::new(TechnicalAnalyst::default()),
        Box::new(SentimentAnalyzer::default()),
        Box::new(SectorSpecialist::default()),
        Box::new(MacroEconomist::default()),
        Box::new(MomentumTrader::default()),
    ]
}

/// Ids of the default roster, in the same canonical order.
pub fn default_roster_ids() -> Vec<AnalystId> {
    default_roster().iter().map(|a| a.id()).collect()
}

#[cfg(test)]
pub(crate) mod test_ctx {
    use super::*;
    use chrono::Utc;

    /// Context with a synthetic close series; last close is the price.
    pub fn ctx_with_closes(symbol: &str, closes: Vec<f64>) -> MarketContext {
        let last_price = closes.last().copied().unwrap_or(0.0);
        MarketContext {
            symbol: symbol.into(),
            sector: "Technology".into(),
            as_of: Utc::now(),
            last_price,
            volume: 1_000_000.0,
            closes,
            fundamentals: None,
            sentiment: None,
            benchmark_return: None,
        }
    }

    /// Flat series of `n` closes at `price`.
    pub fn flat(n: usize, price: f64) -> Vec<f64> {
        vec![price; n]
    }

    /// Linearly trending series from `start` by `step` per close.
    pub fn trending(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }
}
