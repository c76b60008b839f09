//! Risk & diversification filter — validates candidate orders against
//! portfolio constraints.
//!
//! Each rule is an independent [`RiskCheck`]; the [`RiskFilter`] runs them
//! in a fixed order and the first rejection wins. Rejections are values,
//! never errors: the decision engine may re-size or drop the order, and a
//! rejection never aborts the cycle.

use crate::domain::{InstrumentUniverse, Order, OrderSide, PortfolioState};
use crate::policy::TradingPolicy;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const EPS: f64 = 1e-9;

/// Why a candidate order was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    NotTradable,
    PositionCap,
    SectorCap,
    TooManyPositions,
    InsufficientCash,
    ExposureCap,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NotTradable => write!(f, "NotTradable"),
            RejectReason::PositionCap => write!(f, "PositionCap"),
            RejectReason::SectorCap => write!(f, "SectorCap"),
            RejectReason::TooManyPositions => write!(f, "TooManyPositions"),
            RejectReason::InsufficientCash => write!(f, "InsufficientCash"),
            RejectReason::ExposureCap => write!(f, "ExposureCap"),
        }
    }
}

/// Outcome of a risk evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject { reason: RejectReason, detail: String },
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    fn reject(reason: RejectReason, detail: impl Into<String>) -> Self {
        Verdict::Reject { reason, detail: detail.into() }
    }
}

/// Read-only state a check evaluates against.
pub struct RiskContext<'a> {
    pub portfolio: &'a PortfolioState,
    pub prices: &'a HashMap<String, f64>,
    pub equity: f64,
    /// Cash not yet committed to earlier orders in the same batch. The
    /// decision engine decrements this as it emits buys, so a batch is
    /// always jointly fundable, not just order-by-order.
    pub available_cash: f64,
    pub universe: &'a InstrumentUniverse,
    pub policy: &'a TradingPolicy,
}

impl RiskContext<'_> {
    pub fn price_of(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Current market value of the position in `symbol`, zero when flat.
    pub fn position_value(&self, symbol: &str) -> f64 {
        self.portfolio
            .position(symbol)
            .map(|p| {
                let price = self.price_of(symbol).unwrap_or(p.avg_cost);
                p.market_value(price)
            })
            .unwrap_or(0.0)
    }

    /// Current market value of all positions in `sector`.
    pub fn sector_value(&self, sector: &str) -> f64 {
        self.portfolio
            .positions()
            .values()
            .filter(|p| self.universe.sector_of(&p.symbol) == Some(sector))
            .map(|p| {
                let price = self.price_of(&p.symbol).unwrap_or(p.avg_cost);
                p.market_value(price)
            })
            .sum()
    }
}

/// One independently-evaluated risk rule.
pub trait RiskCheck: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict;
}

/// Instrument must exist in the universe, be tradable, and have a price.
pub struct Tradability;

impl RiskCheck for Tradability {
    fn name(&self) -> &str {
        "tradability"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        match ctx.universe.get(&order.symbol) {
            None => Verdict::reject(
                RejectReason::NotTradable,
                format!("{} not in universe", order.symbol),
            ),
            Some(inst) if !inst.tradable => Verdict::reject(
                RejectReason::NotTradable,
                format!("{} flagged non-tradable", order.symbol),
            ),
            Some(_) if ctx.price_of(&order.symbol).is_none() => Verdict::reject(
                RejectReason::NotTradable,
                format!("no price for {}", order.symbol),
            ),
            Some(_) => Verdict::Accept,
        }
    }
}

/// No order in the same direction for a symbol already at its cap, and no
/// sell beyond the held quantity while shorting is disabled.
pub struct ExposureCap;

impl RiskCheck for ExposureCap {
    fn name(&self) -> &str {
        "exposure_cap"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        match order.side {
            OrderSide::Buy => {
                let cap = ctx.policy.position_cap(ctx.equity);
                let held = ctx.position_value(&order.symbol);
                if held + EPS >= cap {
                    Verdict::reject(
                        RejectReason::ExposureCap,
                        format!("{} already at exposure cap ({:.2} >= {:.2})", order.symbol, held, cap),
                    )
                } else {
                    Verdict::Accept
                }
            }
            OrderSide::Sell => {
                if ctx.policy.allow_short {
                    return Verdict::Accept;
                }
                let held = ctx.portfolio.position(&order.symbol).map_or(0.0, |p| p.quantity);
                if order.quantity > held + EPS {
                    Verdict::reject(
                        RejectReason::ExposureCap,
                        format!(
                            "sell of {} {} exceeds held {} with shorting disabled",
                            order.quantity, order.symbol, held
                        ),
                    )
                } else {
                    Verdict::Accept
                }
            }
        }
    }
}

/// New-symbol buys are refused once the portfolio holds the maximum number
/// of concurrent positions.
pub struct MaxOpenPositions;

impl RiskCheck for MaxOpenPositions {
    fn name(&self) -> &str {
        "max_open_positions"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        if order.side != OrderSide::Buy || ctx.portfolio.position(&order.symbol).is_some() {
            return Verdict::Accept;
        }
        let open = ctx.portfolio.open_position_count();
        if open >= ctx.policy.max_open_positions {
            Verdict::reject(
                RejectReason::TooManyPositions,
                format!("{open} open positions at limit {}", ctx.policy.max_open_positions),
            )
        } else {
            Verdict::Accept
        }
    }
}

/// Buy notional must fit in the cash still uncommitted within the batch.
pub struct CashSufficiency;

impl RiskCheck for CashSufficiency {
    fn name(&self) -> &str {
        "cash_sufficiency"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        if order.side != OrderSide::Buy {
            return Verdict::Accept;
        }
        let price = match ctx.price_of(&order.symbol) {
            Some(p) => p,
            None => return Verdict::Accept, // tradability already rejects
        };
        let notional = order.quantity * price;
        let cash = ctx.available_cash;
        if notional > cash + EPS {
            Verdict::reject(
                RejectReason::InsufficientCash,
                format!("order notional {notional:.2} exceeds available cash {cash:.2}"),
            )
        } else {
            Verdict::Accept
        }
    }
}

/// Post-trade position value must stay within the absolute and
/// percentage-of-equity caps. An order sized to exactly the cap passes.
pub struct MaxPositionValue;

impl RiskCheck for MaxPositionValue {
    fn name(&self) -> &str {
        "max_position_value"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        if order.side != OrderSide::Buy {
            return Verdict::Accept;
        }
        let price = match ctx.price_of(&order.symbol) {
            Some(p) => p,
            None => return Verdict::Accept,
        };
        let post = ctx.position_value(&order.symbol) + order.quantity * price;
        let cap = ctx.policy.position_cap(ctx.equity);
        if post > cap + EPS {
            Verdict::reject(
                RejectReason::PositionCap,
                format!("post-trade value {post:.2} exceeds cap {cap:.2}"),
            )
        } else {
            Verdict::Accept
        }
    }
}

/// Post-trade sector exposure must stay within the sector cap.
pub struct SectorConcentration;

impl RiskCheck for SectorConcentration {
    fn name(&self) -> &str {
        "sector_concentration"
    }

    fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        if order.side != OrderSide::Buy {
            return Verdict::Accept;
        }
        let (sector, price) = match (
            ctx.universe.sector_of(&order.symbol),
            ctx.price_of(&order.symbol),
        ) {
            (Some(s), Some(p)) => (s, p),
            _ => return Verdict::Accept,
        };
        let post = ctx.sector_value(sector) + order.quantity * price;
        let cap = ctx.policy.max_sector_pct * ctx.equity;
        if post > cap + EPS {
            Verdict::reject(
                RejectReason::SectorCap,
                format!("post-trade {sector} exposure {post:.2} exceeds cap {cap:.2}"),
            )
        } else {
            Verdict::Accept
        }
    }
}

/// The composed filter: rules run in a fixed order, first rejection wins.
pub struct RiskFilter {
    checks: Vec<Box<dyn RiskCheck>>,
}

impl Default for RiskFilter {
    fn default() -> Self {
        Self {
            checks: vec![
                Box::new(Tradability),
                Box::new(ExposureCap),
                Box::new(MaxOpenPositions),
                Box::new(CashSufficiency),
                Box::new(MaxPositionValue),
                Box::new(SectorConcentration),
            ],
        }
    }
}

impl RiskFilter {
    pub fn new(checks: Vec<Box<dyn RiskCheck>>) -> Self {
        Self { checks }
    }

    pub fn check(&self, order: &Order, ctx: &RiskContext) -> Verdict {
        for check in &self.checks {
            if let Verdict::Reject { reason, detail } = check.check(order, ctx) {
                warn!(
                    "order {} ({} {} {}) rejected by {}: {}",
                    order.id, order.side, order.quantity, order.symbol, check.name(), detail
                );
                return Verdict::Reject { reason, detail };
            }
        }
        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CycleId, Fill, FillId, Instrument, OrderId};
    use chrono::Utc;

    fn universe() -> InstrumentUniverse {
        InstrumentUniverse::new([
            Instrument::new("AAPL", "NASDAQ", "Technology", true),
            Instrument::new("MSFT", "NASDAQ", "Technology", true),
            Instrument::new("JPM", "NYSE", "Financial", true),
            Instrument::new("HALT", "NYSE", "Financial", false),
        ])
    }

    fn buy(symbol: &str, qty: f64) -> Order {
        Order::market(OrderId::new("t-0"), CycleId(0), symbol, OrderSide::Buy, qty)
    }

    fn sell(symbol: &str, qty: f64) -> Order {
        Order::market(OrderId::new("t-1"), CycleId(0), symbol, OrderSide::Sell, qty)
    }

    fn prices() -> HashMap<String, f64> {
        [("AAPL", 100.0), ("MSFT", 200.0), ("JPM", 150.0)]
            .into_iter()
            .map(|(s, p)| (s.to_string(), p))
            .collect()
    }

    fn holding(symbol: &str, qty: f64, price: f64) -> PortfolioState {
        let mut p = PortfolioState::new(100_000.0);
        let order = Order::market(OrderId::new("seed"), CycleId(0), symbol, OrderSide::Buy, qty);
        p.register_order(&order);
        p.apply_fill(&Fill {
            id: FillId::new("seed-fill"),
            order_id: OrderId::new("seed"),
            symbol: symbol.into(),
            side: OrderSide::Buy,
            price,
            quantity: qty,
            timestamp: Utc::now(),
        })
        .unwrap();
        p
    }

    fn ctx<'a>(
        portfolio: &'a PortfolioState,
        prices: &'a HashMap<String, f64>,
        universe: &'a InstrumentUniverse,
        policy: &'a TradingPolicy,
    ) -> RiskContext<'a> {
        RiskContext {
            portfolio,
            prices,
            equity: portfolio.equity(prices),
            available_cash: portfolio.cash(),
            universe,
            policy,
        }
    }

    #[test]
    fn rejects_above_position_cap_accepts_at_cap() {
        let portfolio = PortfolioState::new(100_000.0);
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy { max_position_pct: 0.10, ..Default::default() };
        let c = ctx(&portfolio, &prices, &universe, &policy);
        let filter = RiskFilter::default();

        // Equity 100k, cap 10k, AAPL at 100: 101 shares breach, 100 sit exactly at the cap.
        let over = filter.check(&buy("AAPL", 101.0), &c);
        assert!(matches!(over, Verdict::Reject { reason: RejectReason::PositionCap, .. }));
        assert!(filter.check(&buy("AAPL", 100.0), &c).is_accept());
    }

    #[test]
    fn rejects_sell_without_position() {
        let portfolio = PortfolioState::new(100_000.0);
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy::default();
        let c = ctx(&portfolio, &prices, &universe, &policy);
        let v = RiskFilter::default().check(&sell("JPM", 10.0), &c);
        assert!(matches!(v, Verdict::Reject { reason: RejectReason::ExposureCap, .. }));
    }

    #[test]
    fn accepts_sell_within_position() {
        let portfolio = holding("JPM", 20.0, 150.0);
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy::default();
        let c = ctx(&portfolio, &prices, &universe, &policy);
        assert!(RiskFilter::default().check(&sell("JPM", 10.0), &c).is_accept());
    }

    #[test]
    fn rejects_non_tradable_and_unknown() {
        let portfolio = PortfolioState::new(100_000.0);
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy::default();
        let c = ctx(&portfolio, &prices, &universe, &policy);
        let filter = RiskFilter::default();
        assert!(matches!(
            filter.check(&buy("HALT", 1.0), &c),
            Verdict::Reject { reason: RejectReason::NotTradable, .. }
        ));
        assert!(matches!(
            filter.check(&buy("TSLA", 1.0), &c),
            Verdict::Reject { reason: RejectReason::NotTradable, .. }
        ));
    }

    #[test]
    fn rejects_insufficient_cash() {
        let portfolio = PortfolioState::new(500.0);
        let prices = prices();
        let universe = universe();
        // Loose caps so only the cash rule can fire.
        let policy = TradingPolicy { max_position_pct: 1.0, max_sector_pct: 1.0, ..Default::default() };
        let c = ctx(&portfolio, &prices, &universe, &policy);
        let v = RiskFilter::default().check(&buy("AAPL", 10.0), &c);
        assert!(matches!(v, Verdict::Reject { reason: RejectReason::InsufficientCash, .. }));
    }

    #[test]
    fn rejects_at_max_open_positions() {
        let portfolio = holding("MSFT", 10.0, 200.0);
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy { max_open_positions: 1, ..Default::default() };
        let c = ctx(&portfolio, &prices, &universe, &policy);
        let filter = RiskFilter::default();
        let v = filter.check(&buy("AAPL", 1.0), &c);
        assert!(matches!(v, Verdict::Reject { reason: RejectReason::TooManyPositions, .. }));
        // Adding to an existing position is not a new slot.
        assert!(filter.check(&buy("MSFT", 1.0), &c).is_accept());
    }

    #[test]
    fn rejects_sector_concentration() {
        let portfolio = holding("MSFT", 100.0, 200.0); // 20k Technology
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy {
            max_sector_pct: 0.25,
            max_position_pct: 0.20,
            ..Default::default()
        };
        let c = ctx(&portfolio, &prices, &universe, &policy);
        // Equity 100k; sector cap 25k; 20k held + 10k AAPL breaches.
        let v = RiskFilter::default().check(&buy("AAPL", 100.0), &c);
        assert!(matches!(v, Verdict::Reject { reason: RejectReason::SectorCap, .. }));
        // A different sector is unaffected.
        assert!(RiskFilter::default().check(&buy("JPM", 10.0), &c).is_accept());
    }

    #[test]
    fn rejects_buy_already_at_exposure_cap() {
        let portfolio = holding("AAPL", 50.0, 100.0); // 5k at AAPL=100
        let prices = prices();
        let universe = universe();
        let policy = TradingPolicy { max_position_pct: 0.05, ..Default::default() };
        let c = ctx(&portfolio, &prices, &universe, &policy);
        // Equity 100k, cap 5k, position already there.
        let v = RiskFilter::default().check(&buy("AAPL", 1.0), &c);
        assert!(matches!(v, Verdict::Reject { reason: RejectReason::ExposureCap, .. }));
    }
}
