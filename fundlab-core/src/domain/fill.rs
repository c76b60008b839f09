//! Fill records reported by the execution venue.

use super::ids::{FillId, OrderId};
use super::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confirmation that (part of) an order executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: FillId,
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Gross notional value of the fill.
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}
