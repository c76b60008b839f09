//! Value investor — screens for discounted prices with sane fundamentals.

use super::math::discount_from_high;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Buys instruments trading well below their trailing high with a
/// reasonable P/E; sells richly valued names sitting at their highs.
#[derive(Debug, Clone)]
pub struct ValueInvestor {
    /// Minimum discount from the trailing high to call a price cheap.
    pub min_discount: f64,
    /// Maximum P/E still considered reasonably valued.
    pub max_pe: f64,
    /// Lookback window for the trailing high.
    pub lookback: usize,
}

impl Default for ValueInvestor {
    fn default() -> Self {
        Self { min_discount: 0.15, max_pe: 20.0, lookback: 252 }
    }
}

impl Analyst for ValueInvestor {
    fn id(&self) -> AnalystId {
        AnalystId::new("value-investor")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        if !ctx.has_history(20) {
            return Signal::hold(id, &ctx.symbol, "insufficient history for value screen", ctx.as_of);
        }
        let fundamentals = match ctx.fundamentals {
            Some(f) => f,
            None => return Signal::hold(id, &ctx.symbol, "fundamentals unavailable", ctx.as_of),
        };
        let discount = match discount_from_high(&ctx.closes, self.lookback) {
            Some(d) => d,
            None => return Signal::hold(id, &ctx.symbol, "no trailing high", ctx.as_of),
        };

        if discount >= self.min_discount && fundamentals.pe_ratio > 0.0 && fundamentals.pe_ratio <= self.max_pe {
            let confidence = (0.4 + discount + fundamentals.dividend_yield * 5.0).min(0.95);
            return Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Buy,
                confidence,
                format!(
                    "{:.0}% below trailing high at P/E {:.1}",
                    discount * 100.0,
                    fundamentals.pe_ratio
                ),
                ctx.as_of,
            );
        }

        if fundamentals.pe_ratio > self.max_pe * 2.0 && discount < 0.02 {
            return Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                0.5,
                format!("P/E {:.1} at the highs, no margin of safety", fundamentals.pe_ratio),
                ctx.as_of,
            );
        }

        Signal::new(id, &ctx.symbol, SignalAction::Hold, 0.2, "no value edge", ctx.as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysts::test_ctx::ctx_with_closes;
    use crate::domain::Fundamentals;

    #[test]
    fn buys_discounted_low_pe() {
        let mut closes = vec![120.0; 50];
        closes.push(90.0); // 25% below the high
        let mut ctx = ctx_with_closes("BRK-B", closes);
        ctx.fundamentals = Some(Fundamentals { pe_ratio: 12.0, dividend_yield: 0.02 });
        let s = ValueInvestor::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Buy);
        assert!(s.confidence > 0.5);
    }

    #[test]
    fn sells_rich_pe_at_highs() {
        let closes = vec![100.0; 60];
        let mut ctx = ctx_with_closes("NVDA", closes);
        ctx.fundamentals = Some(Fundamentals { pe_ratio: 55.0, dividend_yield: 0.0 });
        let s = ValueInvestor::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Sell);
    }

    #[test]
    fn holds_without_fundamentals() {
        let ctx = ctx_with_closes("SPY", vec![100.0; 60]);
        let s = ValueInvestor::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.rationale, "fundamentals unavailable");
    }
}
