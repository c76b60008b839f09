//! Paper broker — fills market orders at the decision-time price.
//!
//! The default execution adapter. Fault injection (forced rejections,
//! forced outages, artificial latency) exists so orchestrator tests can
//! exercise the degraded paths without a real venue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fundlab_core::domain::{Fill, FillId, Order};
use log::debug;

use crate::broker::{ExecutionAdapter, ExecutionError, ExecutionReport};

pub struct PaperBroker {
    fill_seq: AtomicU64,
    reject_symbols: Mutex<HashSet<String>>,
    unreachable_symbols: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperBroker {
    pub fn new() -> Self {
        Self {
            fill_seq: AtomicU64::new(0),
            reject_symbols: Mutex::new(HashSet::new()),
            unreachable_symbols: Mutex::new(HashSet::new()),
            latency: Mutex::new(None),
        }
    }

    /// Force every order for `symbol` to come back venue-rejected.
    pub fn reject_symbol(&self, symbol: &str) {
        if let Ok(mut set) = self.reject_symbols.lock() {
            set.insert(symbol.to_string());
        }
    }

    /// Force every order for `symbol` to fail at the transport level.
    pub fn drop_symbol(&self, symbol: &str) {
        if let Ok(mut set) = self.unreachable_symbols.lock() {
            set.insert(symbol.to_string());
        }
    }

    /// Delay every submission by `latency`, for deadline tests.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = Some(latency);
        }
    }

    fn next_fill_id(&self) -> FillId {
        let seq = self.fill_seq.fetch_add(1, Ordering::SeqCst);
        FillId::new(format!("f{seq}"))
    }

    fn contains(set: &Mutex<HashSet<String>>, symbol: &str) -> bool {
        set.lock().map(|s| s.contains(symbol)).unwrap_or(false)
    }
}

#[async_trait]
impl ExecutionAdapter for PaperBroker {
    async fn submit(&self, order: &Order, price_hint: f64) -> Result<ExecutionReport, ExecutionError> {
        let latency = self.latency.lock().ok().and_then(|slot| *slot);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if Self::contains(&self.unreachable_symbols, &order.symbol) {
            return Err(ExecutionError::Unreachable(format!(
                "venue dropped connection on {}",
                order.symbol
            )));
        }
        if Self::contains(&self.reject_symbols, &order.symbol) {
            return Ok(ExecutionReport::Rejected {
                reason: format!("venue refused {}", order.symbol),
            });
        }
        if order.quantity <= 0.0 {
            return Ok(ExecutionReport::Rejected {
                reason: "non-positive quantity".into(),
            });
        }
        if price_hint <= 0.0 {
            return Ok(ExecutionReport::Rejected {
                reason: format!("no usable price for {}", order.symbol),
            });
        }
        let fill = Fill {
            id: self.next_fill_id(),
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            price: price_hint,
            quantity: order.quantity,
            timestamp: Utc::now(),
        };
        debug!("paper fill {}: {} {} {} @ {:.2}", fill.id, fill.side, fill.quantity, fill.symbol, fill.price);
        Ok(ExecutionReport::Filled(fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlab_core::domain::{CycleId, OrderId, OrderSide};

    fn order(symbol: &str) -> Order {
        Order::market(OrderId::new("c0-0"), CycleId(0), symbol, OrderSide::Buy, 10.0)
    }

    #[tokio::test]
    async fn fills_at_hint_price() {
        let broker = PaperBroker::new();
        let report = broker.submit(&order("AAPL"), 187.5).await.unwrap();
        match report {
            ExecutionReport::Filled(fill) => {
                assert_eq!(fill.price, 187.5);
                assert_eq!(fill.quantity, 10.0);
                assert_eq!(fill.order_id, OrderId::new("c0-0"));
            }
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fill_ids_are_unique() {
        let broker = PaperBroker::new();
        let a = broker.submit(&order("AAPL"), 10.0).await.unwrap();
        let b = broker.submit(&order("MSFT"), 10.0).await.unwrap();
        match (a, b) {
            (ExecutionReport::Filled(a), ExecutionReport::Filled(b)) => assert_ne!(a.id, b.id),
            other => panic!("expected fills, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn injected_rejection_and_outage() {
        let broker = PaperBroker::new();
        broker.reject_symbol("TSLA");
        broker.drop_symbol("NVDA");

        match broker.submit(&order("TSLA"), 10.0).await.unwrap() {
            ExecutionReport::Rejected { .. } => {}
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(broker.submit(&order("NVDA"), 10.0).await.is_err());
    }
}
