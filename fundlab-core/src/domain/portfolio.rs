//! Portfolio aggregate — the single authoritative mutable state.
//!
//! All mutation funnels through [`PortfolioState::apply_fill`]. The
//! orchestrator holds the sole `&mut PortfolioState`, which serializes
//! fills in the order the execution adapter reports them and keeps the
//! average-cost accounting exact.
//!
//! Accounting identity: `cash + Σ(quantity × avg_cost)` changes only by
//! the realized P&L of reducing fills. A fill that cannot be reconciled
//! leaves the state untouched and blocks the symbol until resolved.

use super::fill::Fill;
use super::ids::OrderId;
use super::order::{Order, OrderSide};
use super::position::Position;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Tolerance for cash/quantity comparisons in fill validation.
const EPS: f64 = 1e-9;

/// Why a fill could not be reconciled against the portfolio.
///
/// A reconciliation failure never mutates state. The offending symbol is
/// blocked: further fills for it are refused until `clear_block` is called.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ReconciliationError {
    #[error("fill references unknown order {order_id}")]
    UnknownOrder { order_id: OrderId },

    #[error("fill does not match order {order_id}: {detail}")]
    OrderMismatch { order_id: OrderId, detail: String },

    #[error("fill for {symbol} would drive cash negative ({cash:.2} available, {cost:.2} required)")]
    InsufficientCash { symbol: String, cash: f64, cost: f64 },

    #[error("fill sells {fill_quantity} of {symbol} but only {held_quantity} held")]
    OversellsPosition {
        symbol: String,
        fill_quantity: f64,
        held_quantity: f64,
    },

    #[error("symbol {symbol} is blocked by an earlier reconciliation failure")]
    SymbolBlocked { symbol: String },
}

/// Outcome of a successfully applied fill, for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFill {
    pub order_id: OrderId,
    /// Signed cash movement (negative for buys).
    pub cash_delta: f64,
    /// Realized P&L of this fill (zero for buys).
    pub realized_pnl: f64,
    /// Whether the fill consumed the order's remaining quantity.
    pub order_completed: bool,
}

/// An order awaiting its terminal report, with cumulative filled quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OpenOrder {
    order: Order,
    filled: f64,
}

/// Point-in-time portfolio valuation, embedded in every cycle record and
/// used to bootstrap state on restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub as_of: DateTime<Utc>,
    pub cash: f64,
    pub initial_capital: f64,
    /// Positions in symbol order.
    pub positions: Vec<Position>,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub equity: f64,
}

/// Authoritative record of cash, positions, and realized P&L.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    cash: f64,
    initial_capital: f64,
    positions: HashMap<String, Position>,
    realized_pnl: f64,
    open_orders: HashMap<OrderId, OpenOrder>,
    blocked: BTreeSet<String>,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            realized_pnl: 0.0,
            open_orders: HashMap::new(),
            blocked: BTreeSet::new(),
        }
    }

    /// Rebuild state from a snapshot (restart bootstrap).
    ///
    /// Open orders are not carried across restarts: every order gets a
    /// terminal report within its own cycle.
    pub fn from_snapshot(snapshot: &PortfolioSnapshot) -> Self {
        Self {
            cash: snapshot.cash,
            initial_capital: snapshot.initial_capital,
            positions: snapshot
                .positions
                .iter()
                .map(|p| (p.symbol.clone(), p.clone()))
                .collect(),
            realized_pnl: snapshot.realized_pnl,
            open_orders: HashMap::new(),
            blocked: BTreeSet::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_blocked(&self, symbol: &str) -> bool {
        self.blocked.contains(symbol)
    }

    pub fn blocked_symbols(&self) -> impl Iterator<Item = &str> {
        self.blocked.iter().map(String::as_str)
    }

    /// Manually resolve a reconciliation block for `symbol`.
    pub fn clear_block(&mut self, symbol: &str) -> bool {
        self.blocked.remove(symbol)
    }

    /// Total equity: cash + market value of all positions.
    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .map(|(sym, pos)| {
                let price = prices.get(sym).copied().unwrap_or(pos.avg_cost);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    pub fn unrealized_pnl(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .iter()
            .map(|(sym, pos)| {
                let price = prices.get(sym).copied().unwrap_or(pos.avg_cost);
                pos.unrealized_pnl(price)
            })
            .sum()
    }

    /// Index an order so its fills can be reconciled.
    pub fn register_order(&mut self, order: &Order) {
        self.open_orders
            .insert(order.id.clone(), OpenOrder { order: order.clone(), filled: 0.0 });
    }

    /// Drop an order from the open index (terminal Reject/Cancel, or a
    /// completing fill already removed it).
    pub fn complete_order(&mut self, order_id: &OrderId) {
        self.open_orders.remove(order_id);
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }

    /// The only mutator: reconcile one fill against its order and apply it.
    ///
    /// Validation happens entirely before any mutation, so a rejected fill
    /// leaves the portfolio byte-identical. Unknown orders, order/fill
    /// mismatches, overfills, negative cash, and oversells all fail; every
    /// failure except `SymbolBlocked` itself blocks the symbol.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<AppliedFill, ReconciliationError> {
        if self.blocked.contains(&fill.symbol) {
            return Err(ReconciliationError::SymbolBlocked { symbol: fill.symbol.clone() });
        }

        let open = match self.open_orders.get(&fill.order_id) {
            Some(open) => open,
            None => {
                self.blocked.insert(fill.symbol.clone());
                return Err(ReconciliationError::UnknownOrder { order_id: fill.order_id.clone() });
            }
        };

        if let Some(detail) = Self::mismatch_detail(open, fill) {
            self.blocked.insert(fill.symbol.clone());
            return Err(ReconciliationError::OrderMismatch {
                order_id: fill.order_id.clone(),
                detail,
            });
        }

        match fill.side {
            OrderSide::Buy => {
                let cost = fill.notional();
                if cost > self.cash + EPS {
                    self.blocked.insert(fill.symbol.clone());
                    return Err(ReconciliationError::InsufficientCash {
                        symbol: fill.symbol.clone(),
                        cash: self.cash,
                        cost,
                    });
                }
            }
            OrderSide::Sell => {
                let held = self.positions.get(&fill.symbol).map_or(0.0, |p| p.quantity);
                if fill.quantity > held + EPS {
                    self.blocked.insert(fill.symbol.clone());
                    return Err(ReconciliationError::OversellsPosition {
                        symbol: fill.symbol.clone(),
                        fill_quantity: fill.quantity,
                        held_quantity: held,
                    });
                }
            }
        }

        // Validation passed; mutate.
        let (cash_delta, realized) = match fill.side {
            OrderSide::Buy => {
                let cost = fill.notional();
                self.cash -= cost;
                self.positions
                    .entry(fill.symbol.clone())
                    .and_modify(|p| p.add(fill.quantity, fill.price))
                    .or_insert_with(|| {
                        Position::new(fill.symbol.clone(), fill.quantity, fill.price)
                    });
                (-cost, 0.0)
            }
            OrderSide::Sell => {
                let proceeds = fill.notional();
                self.cash += proceeds;
                let pos = self
                    .positions
                    .get_mut(&fill.symbol)
                    .expect("oversell check guarantees position exists");
                let realized = pos.reduce(fill.quantity, fill.price);
                if pos.quantity < EPS {
                    self.positions.remove(&fill.symbol);
                }
                self.realized_pnl += realized;
                (proceeds, realized)
            }
        };

        let open = self
            .open_orders
            .get_mut(&fill.order_id)
            .expect("order presence checked above");
        open.filled += fill.quantity;
        let order_completed = open.filled + EPS >= open.order.quantity;
        if order_completed {
            self.open_orders.remove(&fill.order_id);
        }

        debug!(
            "applied fill {} for {}: {} {} @ {:.2}, cash {:.2}",
            fill.id, fill.symbol, fill.side, fill.quantity, fill.price, self.cash
        );

        Ok(AppliedFill {
            order_id: fill.order_id.clone(),
            cash_delta,
            realized_pnl: realized,
            order_completed,
        })
    }

    fn mismatch_detail(open: &OpenOrder, fill: &Fill) -> Option<String> {
        if open.order.symbol != fill.symbol {
            return Some(format!(
                "order is for {}, fill is for {}",
                open.order.symbol, fill.symbol
            ));
        }
        if open.order.side != fill.side {
            return Some(format!(
                "order side {} does not match fill side {}",
                open.order.side, fill.side
            ));
        }
        let remaining = open.order.quantity - open.filled;
        if fill.quantity > remaining + EPS {
            return Some(format!(
                "fill quantity {} exceeds remaining order quantity {}",
                fill.quantity, remaining
            ));
        }
        if fill.quantity <= 0.0 || fill.price <= 0.0 {
            return Some(format!(
                "non-positive fill quantity {} or price {}",
                fill.quantity, fill.price
            ));
        }
        None
    }

    /// Valuation snapshot for the audit trail, positions in symbol order.
    pub fn snapshot(&self, prices: &HashMap<String, f64>, as_of: DateTime<Utc>) -> PortfolioSnapshot {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        PortfolioSnapshot {
            as_of,
            cash: self.cash,
            initial_capital: self.initial_capital,
            positions,
            realized_pnl: self.realized_pnl,
            unrealized_pnl: self.unrealized_pnl(prices),
            equity: self.equity(prices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{CycleId, FillId};
    use proptest::prelude::*;

    fn order(id: &str, symbol: &str, side: OrderSide, qty: f64) -> Order {
        Order::market(OrderId::new(id), CycleId(0), symbol, side, qty)
    }

    fn fill(order_id: &str, symbol: &str, side: OrderSide, price: f64, qty: f64) -> Fill {
        Fill {
            id: FillId::new(format!("f-{order_id}")),
            order_id: OrderId::new(order_id),
            symbol: symbol.into(),
            side,
            price,
            quantity: qty,
            timestamp: Utc::now(),
        }
    }

    fn funded(cash: f64) -> PortfolioState {
        PortfolioState::new(cash)
    }

    #[test]
    fn buy_fill_moves_cash_into_position() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        let applied = p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 10.0)).unwrap();
        assert_eq!(applied.cash_delta, -1000.0);
        assert!(applied.order_completed);
        assert_eq!(p.cash(), 9_000.0);
        let pos = p.position("SPY").unwrap();
        assert_eq!(pos.quantity, 10.0);
        assert_eq!(pos.avg_cost, 100.0);
    }

    #[test]
    fn sell_fill_realizes_pnl_and_closes_at_zero() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 10.0)).unwrap();
        p.register_order(&order("c1-0", "SPY", OrderSide::Sell, 10.0));
        let applied = p.apply_fill(&fill("c1-0", "SPY", OrderSide::Sell, 110.0, 10.0)).unwrap();
        assert_eq!(applied.realized_pnl, 100.0);
        assert_eq!(p.realized_pnl(), 100.0);
        assert!(p.position("SPY").is_none());
        assert_eq!(p.cash(), 10_100.0);
    }

    #[test]
    fn unknown_order_blocks_symbol() {
        let mut p = funded(10_000.0);
        let err = p.apply_fill(&fill("ghost", "SPY", OrderSide::Buy, 100.0, 1.0)).unwrap_err();
        assert!(matches!(err, ReconciliationError::UnknownOrder { .. }));
        assert!(p.is_blocked("SPY"));
        // Subsequent fills for the symbol are refused even with a valid order.
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 1.0));
        let err = p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 1.0)).unwrap_err();
        assert!(matches!(err, ReconciliationError::SymbolBlocked { .. }));
        // Until the block is cleared.
        assert!(p.clear_block("SPY"));
        assert!(p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 1.0)).is_ok());
    }

    #[test]
    fn negative_cash_fill_is_rejected_whole() {
        let mut p = funded(500.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        let err = p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 10.0)).unwrap_err();
        assert!(matches!(err, ReconciliationError::InsufficientCash { .. }));
        // Never silently clamped: state untouched.
        assert_eq!(p.cash(), 500.0);
        assert!(p.position("SPY").is_none());
        assert!(p.is_blocked("SPY"));
    }

    #[test]
    fn oversell_is_rejected() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Sell, 5.0));
        let err = p.apply_fill(&fill("c0-0", "SPY", OrderSide::Sell, 100.0, 5.0)).unwrap_err();
        assert!(matches!(err, ReconciliationError::OversellsPosition { .. }));
        assert_eq!(p.cash(), 10_000.0);
    }

    #[test]
    fn mismatched_fill_is_rejected() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        let err = p.apply_fill(&fill("c0-0", "SPY", OrderSide::Sell, 100.0, 10.0)).unwrap_err();
        assert!(matches!(err, ReconciliationError::OrderMismatch { .. }));
    }

    #[test]
    fn partial_fills_complete_order_cumulatively() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        let mut f1 = fill("c0-0", "SPY", OrderSide::Buy, 100.0, 4.0);
        f1.id = FillId::new("f1");
        let applied = p.apply_fill(&f1).unwrap();
        assert!(!applied.order_completed);
        let mut f2 = fill("c0-0", "SPY", OrderSide::Buy, 100.0, 6.0);
        f2.id = FillId::new("f2");
        let applied = p.apply_fill(&f2).unwrap();
        assert!(applied.order_completed);
        assert_eq!(p.open_order_count(), 0);
        assert_eq!(p.position("SPY").unwrap().quantity, 10.0);
    }

    #[test]
    fn snapshot_roundtrips_through_bootstrap() {
        let mut p = funded(10_000.0);
        p.register_order(&order("c0-0", "SPY", OrderSide::Buy, 10.0));
        p.apply_fill(&fill("c0-0", "SPY", OrderSide::Buy, 100.0, 10.0)).unwrap();
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 105.0);
        let snap = p.snapshot(&prices, Utc::now());
        assert_eq!(snap.equity, 9_000.0 + 1_050.0);
        assert_eq!(snap.unrealized_pnl, 50.0);

        let restored = PortfolioState::from_snapshot(&snap);
        assert_eq!(restored.cash(), p.cash());
        assert_eq!(restored.position("SPY"), p.position("SPY"));
        assert_eq!(restored.open_order_count(), 0);
    }

    proptest! {
        /// Cost-basis identity: over any sequence of valid buy/sell fills,
        /// `cash + Σ(qty × avg_cost)` equals initial capital plus total
        /// realized P&L, with no drift.
        #[test]
        fn cost_basis_identity_holds(
            ops in proptest::collection::vec((1u8..=2, 1u32..=50, 50u32..=150), 1..40)
        ) {
            let mut p = PortfolioState::new(1_000_000.0);
            let mut seq = 0u64;
            for (kind, qty, price) in ops {
                let qty = qty as f64;
                let price = price as f64;
                let side = if kind == 1 { OrderSide::Buy } else { OrderSide::Sell };
                let id = format!("c0-{seq}");
                seq += 1;
                p.register_order(&order(&id, "SPY", side, qty));
                // Invalid fills (oversells) are rejected and must not move state.
                let before_cash = p.cash();
                let _ = p.apply_fill(&fill(&id, "SPY", side, price, qty));
                if p.is_blocked("SPY") {
                    prop_assert_eq!(p.cash(), before_cash);
                    p.clear_block("SPY");
                    p.complete_order(&OrderId::new(&id));
                }

                let cost_basis: f64 = p.positions().values().map(|pos| pos.cost_basis()).sum();
                let identity = p.cash() + cost_basis;
                let expected = 1_000_000.0 + p.realized_pnl();
                prop_assert!((identity - expected).abs() < 1e-6,
                    "identity {} != expected {}", identity, expected);
            }
        }
    }
}
