//! Technical analyst — moving-average crossover state.

use super::math::moving_average;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Short-over-long MA reads bullish, short-under-long bearish; confidence
/// scales with the gap between the averages.
#[derive(Debug, Clone)]
pub struct TechnicalAnalyst {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for TechnicalAnalyst {
    fn default() -> Self {
        Self { short_window: 10, long_window: 30 }
    }
}

impl Analyst for TechnicalAnalyst {
    fn id(&self) -> AnalystId {
        AnalystId::new("technical-analyst")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let (short, long) = match (
            moving_average(&ctx.closes, self.short_window),
            moving_average(&ctx.closes, self.long_window),
        ) {
            (Some(s), Some(l)) if l > 0.0 => (s, l),
            _ => {
                return Signal::hold(
                    id,
                    &ctx.symbol,
                    format!("needs {} closes for MA crossover", self.long_window),
                    ctx.as_of,
                )
            }
        };

        // 3% separation between the averages maps to full conviction.
        let gap = (short - long) / long;
        let confidence = ((gap.abs() / 0.03).min(1.0) * 0.7 + 0.2).min(0.9);

        if gap > 0.0 {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Buy,
                confidence,
                format!("ma({}) {:.1}% above ma({})", self.short_window, gap * 100.0, self.long_window),
                ctx.as_of,
            )
        } else if gap < 0.0 {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                confidence,
                format!("ma({}) {:.1}% below ma({})", self.short_window, -gap * 100.0, self.long_window),
                ctx.as_of,
            )
        } else {
            Signal::new(id, &ctx.symbol, SignalAction::Hold, 0.2, "averages flat", ctx.as_of)
        }
    }
}
