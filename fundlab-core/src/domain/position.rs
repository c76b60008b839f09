//! Position tracking with weighted-average-cost accounting.

use serde::{Deserialize, Serialize};

/// An open position. Quantity never goes negative: short selling is
/// refused upstream (risk filter) and again in `PortfolioState::apply_fill`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: f64, avg_cost: f64) -> Self {
        Self { symbol: symbol.into(), quantity, avg_cost }
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_cost
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.avg_cost)
    }

    /// Fold `quantity` shares bought at `price` into the weighted-average cost.
    pub fn add(&mut self, quantity: f64, price: f64) {
        let total = self.quantity + quantity;
        self.avg_cost = (self.cost_basis() + quantity * price) / total;
        self.quantity = total;
    }

    /// Remove `quantity` shares sold at `price`; returns the realized P&L.
    /// Average cost is unchanged by a reduction.
    pub fn reduce(&mut self, quantity: f64, price: f64) -> f64 {
        self.quantity -= quantity;
        (price - self.avg_cost) * quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_raises_weighted_average() {
        let mut pos = Position::new("SPY", 10.0, 100.0);
        pos.add(10.0, 110.0);
        assert_eq!(pos.quantity, 20.0);
        assert!((pos.avg_cost - 105.0).abs() < 1e-12);
    }

    #[test]
    fn reduce_realizes_pnl_and_keeps_avg_cost() {
        let mut pos = Position::new("SPY", 20.0, 105.0);
        let realized = pos.reduce(5.0, 115.0);
        assert_eq!(realized, 50.0);
        assert_eq!(pos.quantity, 15.0);
        assert_eq!(pos.avg_cost, 105.0);
    }

    #[test]
    fn valuation_views() {
        let pos = Position::new("SPY", 10.0, 100.0);
        assert_eq!(pos.market_value(110.0), 1100.0);
        assert_eq!(pos.cost_basis(), 1000.0);
        assert_eq!(pos.unrealized_pnl(110.0), 100.0);
    }
}
