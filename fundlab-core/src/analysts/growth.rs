//! Growth hunter — looks for sustained uptrends across several horizons.

use super::math::trailing_return;
use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

/// Buys when short, medium, and long trailing returns are all positive,
/// sells when all are negative. Mixed horizons hold.
#[derive(Debug, Clone)]
pub struct GrowthHunter {
    pub windows: [usize; 3],
}

impl Default for GrowthHunter {
    fn default() -> Self {
        Self { windows: [20, 60, 120] }
    }
}

impl Analyst for GrowthHunter {
    fn id(&self) -> AnalystId {
        AnalystId::new("growth-hunter")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let longest = self.windows[2];
        if !ctx.has_history(longest + 1) {
            return Signal::hold(
                id,
                &ctx.symbol,
                format!("needs {} closes for growth screen", longest + 1),
                ctx.as_of,
            );
        }
        let returns: Vec<f64> = self
            .windows
            .iter()
            .filter_map(|&w| trailing_return(&ctx.closes, w))
            .collect();
        if returns.len() != 3 {
            return Signal::hold(id, &ctx.symbol, "non-positive prices in window", ctx.as_of);
        }

        let all_up = returns.iter().all(|r| *r > 0.0);
        let all_down = returns.iter().all(|r| *r < 0.0);
        // Annual-horizon return drives conviction; 30% maps to full confidence.
        let conviction = (returns[2].abs() / 0.30).min(1.0) * 0.8 + 0.1;

        if all_up {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Buy,
                conviction,
                format!("uptrend across horizons, {:.1}% over {} closes", returns[2] * 100.0, self.windows[2]),
                ctx.as_of,
            )
        } else if all_down {
            Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Sell,
                conviction,
                format!("downtrend across horizons, {:.1}% over {} closes", returns[2] * 100.0, self.windows[2]),
                ctx.as_of,
            )
        } else {
            Signal::new(id, &ctx.symbol, SignalAction::Hold, 0.2, "mixed trend horizons", ctx.as_of)
        }
    }
}
