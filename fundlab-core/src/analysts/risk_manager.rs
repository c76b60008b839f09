//! Risk manager — vetoes instruments whose realized volatility spikes.
//!
//! Ranked first in the default tie-break order: when the panel deadlocks,
//! the risk desk decides.

use super::math::realized_volatility;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

#[derive(Debug, Clone)]
pub struct RiskManager {
    /// Daily realized volatility above which the desk wants out.
    pub vol_ceiling: f64,
    pub window: usize,
}

impl Default for RiskManager {
    fn default() -> Self {
        Self { vol_ceiling: 0.03, window: 20 }
    }
}

impl Analyst for RiskManager {
    fn id(&self) -> AnalystId {
        AnalystId::new("risk-manager")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let vol = match realized_volatility(&ctx.closes, self.window) {
            Some(v) => v,
            None => {
                return Signal::hold(
                    id,
                    &ctx.symbol,
                    format!("needs {} closes for volatility estimate", self.window + 1),
                    ctx.as_of,
                )
            }
        };

        if vol > self.vol_ceiling {
            // Scale conviction with how far the ceiling is breached; a 2x
            // breach is a full-conviction veto.
            let confidence = ((vol / self.vol_ceiling - 1.0).min(1.0) * 0.5 + 0.45).min(0.95);
            return Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                confidence,
                format!("daily vol {:.2}% above {:.2}% ceiling", vol * 100.0, self.vol_ceiling * 100.0),
                ctx.as_of,
            );
        }

        Signal::new(
            id,
            &ctx.symbol,
            SignalAction::Hold,
            0.3,
            format!("volatility {:.2}% within tolerance", vol * 100.0),
            ctx.as_of,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysts::test_ctx::{ctx_with_closes, flat};

    fn choppy(n: usize) -> Vec<f64> {
        // Alternating ±6% closes blow through a 3% daily-vol ceiling.
        (0..n).map(|i| if i % 2 == 0 { 100.0 } else { 106.0 }).collect()
    }

    #[test]
    fn vetoes_volatility_spike() {
        let ctx = ctx_with_closes("GME", choppy(40));
        let s = RiskManager::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Sell);
        assert!(s.confidence >= 0.45);
    }

    #[test]
    fn calm_markets_hold() {
        let ctx = ctx_with_closes("KO", flat(40, 60.0));
        let s = RiskManager::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
        assert!(s.confidence > 0.0);
    }

    #[test]
    fn short_history_downgrades() {
        let ctx = ctx_with_closes("IPO", flat(5, 60.0));
        let s = RiskManager::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
        assert_eq!(s.confidence, 0.0);
    }
}
