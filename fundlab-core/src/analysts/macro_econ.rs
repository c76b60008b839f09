//! Macro economist — benchmark regime tilt.

use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Reads the benchmark's trailing return as a risk-on/risk-off regime and
/// tilts every instrument the same way, with deliberately modest
/// conviction — macro is a tiebreaker voice, not a stock picker.
#[derive(Debug, Clone)]
pub struct MacroEconomist {
    /// Benchmark return beyond which the regime reads risk-on/risk-off.
    pub regime_threshold: f64,
}

impl Default for MacroEconomist {
    fn default() -> Self {
        Self { regime_threshold: 0.02 }
    }
}

impl Analyst for MacroEconomist {
    fn id(&self) -> AnalystId {
        AnalystId::new("macro-economist")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let benchmark = match ctx.benchmark_return {
            Some(b) if b.is_finite() => b,
            _ => return Signal::hold(id, &ctx.symbol, "benchmark return unavailable", ctx.as_of),
        };

        let confidence = ((benchmark.abs() / 0.08).min(1.0) * 0.4 + 0.15).min(0.55);
        if benchmark > self.regime_threshold {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Buy,
                confidence,
                format!("risk-on regime, benchmark {:.1}%", benchmark * 100.0),
                ctx.as_of,
            )
        } else if benchmark < -self.regime_threshold {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                confidence,
                format!("risk-off regime, benchmark {:.1}%", benchmark * 100.0),
                ctx.as_of,
            )
        } else {
            Signal::new(id, &ctx.symbol, SignalAction::Hold, 0.2, "neutral macro regime", ctx.as_of)
        }
    }
}
