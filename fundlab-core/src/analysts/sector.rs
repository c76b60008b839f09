//! Sector specialist — relative strength within a covered sector.

use super::math::trailing_return;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Covers one sector and compares the instrument's trailing return against
/// the benchmark. Instruments outside the covered sector hold with zero
/// confidence (no opinion, not a failure of conviction).
#[derive(Debug, Clone)]
pub struct SectorSpecialist {
    pub sector: String,
    pub window: usize,
    /// Relative-strength edge (vs benchmark) required to act.
    pub min_edge: f64,
}

impl SectorSpecialist {
    pub fn new(sector: impl Into<String>) -> Self {
        Self { sector: sector.into(), window: 20, min_edge: 0.02 }
    }
}

impl Default for SectorSpecialist {
    fn default() -> Self {
        Self::new("Technology")
    }
}

impl Analyst for SectorSpecialist {
    fn id(&self) -> AnalystId {
        AnalystId::new("sector-specialist")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        if ctx.sector != self.sector {
            return Signal::hold(
                id,
                &ctx.symbol,
                format!("outside covered sector {}", self.sector),
                ctx.as_of,
            );
        }
        let own = match trailing_return(&ctx.closes, self.window) {
            Some(r) => r,
            None => {
                return Signal::hold(
                    id,
                    &ctx.symbol,
                    format!("needs {} closes for relative strength", self.window + 1),
                    ctx.as_of,
                )
            }
        };
        let benchmark = match ctx.benchmark_return {
            Some(b) if b.is_finite() => b,
            _ => return Signal::hold(id, &ctx.symbol, "benchmark return unavailable", ctx.as_of),
        };

        let edge = own - benchmark;
        let confidence = ((edge.abs() / 0.10).min(1.0) * 0.7 + 0.2).min(0.9);
        if edge >= self.min_edge {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Buy,
                confidence,
                format!("leads benchmark by {:.1}% in {}", edge * 100.0, self.sector),
                ctx.as_of,
            )
        } else if edge <= -self.min_edge {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                confidence,
                format!("lags benchmark by {:.1}% in {}", -edge * 100.0, self.sector),
                ctx.as_of,
            )
        } else {
            Signal::new(id, &ctx.symbol, SignalAction::Hold, 0.2, "tracks its benchmark", ctx.as_of)
        }
    }
}
