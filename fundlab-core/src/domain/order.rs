//! Orders and their terminal states.

use super::ids::{CycleId, OrderId};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order pricing type. The paper venue only supports market orders; the
/// enum exists so the wire shape doesn't change when limits are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
}

/// Terminal state reported by the execution adapter.
///
/// Kept off the `Order` itself: orders are immutable after creation, and
/// the venue is the only authority on how they ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Filled,
    Rejected { reason: String },
    Cancelled { reason: String },
}

/// An immutable order produced by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub cycle: CycleId,
    pub symbol: String,
    pub side: OrderSide,
    /// Whole shares; the decision engine floors fractional sizes.
    pub quantity: f64,
    pub order_type: OrderType,
}

impl Order {
    pub fn market(
        id: OrderId,
        cycle: CycleId,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
    ) -> Self {
        Self {
            id,
            cycle,
            symbol: symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
        }
    }

    /// Signed cash impact of executing `quantity` at `price`
    /// (negative for buys).
    pub fn cash_delta(&self, price: f64) -> f64 {
        match self.side {
            OrderSide::Buy => -(self.quantity * price),
            OrderSide::Sell => self.quantity * price,
        }
    }
}
