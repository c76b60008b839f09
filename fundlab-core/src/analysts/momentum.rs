//! Momentum trader — rate-of-change continuation.

use super::math::trailing_return;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Follows the trailing rate of change: strong moves are expected to
/// continue in the same direction.
#[derive(Debug, Clone)]
pub struct MomentumTrader {
    pub window: usize,
    /// Minimum absolute trailing return to call momentum.
    pub min_roc: f64,
}

impl Default for MomentumTrader {
    fn default() -> Self {
        Self { window: 20, min_roc: 0.05 }
    }
}

impl Analyst for MomentumTrader {
    fn id(&self) -> AnalystId {
        AnalystId::new("momentum-trader")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let roc = match trailing_return(&ctx.closes, self.window) {
            Some(r) => r,
            None => {
                return Signal::hold(
                    id,
                    &ctx.symbol,
                    format!("needs {} closes for rate of change", self.window + 1),
                    ctx.as_of,
                )
            }
        };

        if roc.abs() < self.min_roc {
            return Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Hold,
                0.2,
                format!("roc {:.1}% below momentum threshold", roc * 100.0),
                ctx.as_of,
            );
        }

        // 20% over the window is full conviction.
        let confidence = ((roc.abs() / 0.20).min(1.0) * 0.7 + 0.2).min(0.9);
        let action = if roc > 0.0 { SignalAction::Buy } else { SignalAction::Sell };
        Signal::new(
            id,
            &ctx.symbol,
            action,
            confidence,
            format!("{:.1}% move over {} closes", roc * 100.0, self.window),
            ctx.as_of,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysts::test_ctx::{ctx_with_closes, flat, trending};

    #[test]
    fn strong_upmove_buys() {
        let ctx = ctx_with_closes("NVDA", trending(30, 100.0, 1.0));
        let s = MomentumTrader::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Buy);
        assert!(s.confidence > 0.5);
    }

    #[test]
    fn strong_downmove_sells() {
        let ctx = ctx_with_closes("RIVN", trending(30, 100.0, -1.0));
        let s = MomentumTrader::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Sell);
    }

    #[test]
    fn weak_move_holds() {
        let ctx = ctx_with_closes("KO", flat(30, 60.0));
        let s = MomentumTrader::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
    }
}
