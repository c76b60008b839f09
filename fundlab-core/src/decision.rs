//! Fund-manager decision engine — turns aggregated recommendations into
//! sized orders, vetted by the risk filter.
//!
//! The engine never fails: every recommendation produces a
//! [`DecisionRecord`] explaining what happened to it, and only accepted
//! candidates become orders. Given the same recommendations, portfolio,
//! prices, and policy, the output is byte-for-byte identical.

use crate::aggregate::AggregatedRecommendation;
use crate::domain::{
    CycleId, InstrumentUniverse, Order, OrderId, OrderSide, PortfolioState, SignalAction,
};
use crate::policy::{OrderSizing, TradingPolicy};
use crate::risk::{RejectReason, RiskContext, RiskFilter, Verdict};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the engine did with one recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    /// An order was produced. `resized` is set when the original size was
    /// cut down to fit the per-position cap.
    Submitted { order_id: OrderId, quantity: f64, resized: bool },
    /// Strength fell below the policy's minimum.
    SkippedWeak,
    /// Net action was Hold.
    SkippedHold,
    /// Sizing produced less than one whole share.
    SkippedZeroSize,
    /// The risk filter refused the candidate (after any re-size attempt).
    RejectedByRisk { reason: RejectReason, detail: String },
}

/// One recommendation's audit trail through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub symbol: String,
    pub action: SignalAction,
    pub strength: f64,
    pub outcome: DecisionOutcome,
    pub rationale: String,
}

/// All orders and decision records for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionBatch {
    pub orders: Vec<Order>,
    pub decisions: Vec<DecisionRecord>,
}

/// Run every recommendation through sizing and the risk filter.
///
/// Recommendations are processed in symbol order regardless of input
/// order, and order ids are assigned sequentially within the cycle. Cash
/// committed to an earlier buy in the batch is unavailable to later ones,
/// so the emitted order set is always jointly fundable.
pub fn decide(
    recommendations: &[AggregatedRecommendation],
    portfolio: &PortfolioState,
    prices: &HashMap<String, f64>,
    universe: &InstrumentUniverse,
    policy: &TradingPolicy,
    cycle: CycleId,
) -> DecisionBatch {
    let mut recs: Vec<&AggregatedRecommendation> = recommendations.iter().collect();
    recs.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let equity = portfolio.equity(prices);
    let filter = RiskFilter::default();
    let mut available_cash = portfolio.cash();

    let mut batch = DecisionBatch::default();
    let mut seq = 0u64;

    for rec in recs {
        let rationale = summarize_rationale(rec);
        let record = |outcome| DecisionRecord {
            symbol: rec.symbol.clone(),
            action: rec.net_action,
            strength: rec.strength,
            outcome,
            rationale: rationale.clone(),
        };

        let side = match rec.net_action {
            SignalAction::Hold => {
                batch.decisions.push(record(DecisionOutcome::SkippedHold));
                continue;
            }
            SignalAction::Buy => OrderSide::Buy,
            SignalAction::Sell => OrderSide::Sell,
        };

        if rec.strength < policy.min_signal_strength {
            debug!(
                "{}: {} strength {:.3} below minimum {:.3}",
                rec.symbol, rec.net_action, rec.strength, policy.min_signal_strength
            );
            batch.decisions.push(record(DecisionOutcome::SkippedWeak));
            continue;
        }

        let price = match prices.get(&rec.symbol).copied() {
            Some(p) if p > 0.0 => p,
            _ => {
                batch.decisions.push(record(DecisionOutcome::RejectedByRisk {
                    reason: RejectReason::NotTradable,
                    detail: format!("no price for {}", rec.symbol),
                }));
                continue;
            }
        };

        let quantity = size_order(rec, side, price, equity, available_cash, portfolio, policy);
        if quantity < 1.0 {
            batch.decisions.push(record(DecisionOutcome::SkippedZeroSize));
            continue;
        }

        let order = Order::market(OrderId::for_cycle(cycle, seq), cycle, &rec.symbol, side, quantity);
        seq += 1;

        let ctx = RiskContext { portfolio, prices, equity, available_cash, universe, policy };
        match filter.check(&order, &ctx) {
            Verdict::Accept => {
                info!(
                    "cycle {} order {}: {} {} {} @ ~{:.2}",
                    cycle, order.id, order.side, order.quantity, order.symbol, price
                );
                if side == OrderSide::Buy {
                    available_cash -= order.quantity * price;
                }
                batch.decisions.push(record(DecisionOutcome::Submitted {
                    order_id: order.id.clone(),
                    quantity: order.quantity,
                    resized: false,
                }));
                batch.orders.push(order);
            }
            Verdict::Reject { reason: RejectReason::PositionCap, detail }
                if side == OrderSide::Buy =>
            {
                // One re-size attempt down to the remaining headroom.
                match resize_to_cap(&order, price, equity, portfolio, policy) {
                    Some(resized) if filter.check(&resized, &ctx).is_accept() => {
                        info!(
                            "cycle {} order {} re-sized {} -> {} to fit position cap",
                            cycle, resized.id, quantity, resized.quantity
                        );
                        available_cash -= resized.quantity * price;
                        batch.decisions.push(record(DecisionOutcome::Submitted {
                            order_id: resized.id.clone(),
                            quantity: resized.quantity,
                            resized: true,
                        }));
                        batch.orders.push(resized);
                    }
                    _ => {
                        batch.decisions.push(record(DecisionOutcome::RejectedByRisk {
                            reason: RejectReason::PositionCap,
                            detail,
                        }));
                    }
                }
            }
            Verdict::Reject { reason, detail } => {
                batch.decisions.push(record(DecisionOutcome::RejectedByRisk { reason, detail }));
            }
        }
    }

    batch
}

/// Whole-share quantity for a recommendation, before risk vetting.
fn size_order(
    rec: &AggregatedRecommendation,
    side: OrderSide,
    price: f64,
    equity: f64,
    available_cash: f64,
    portfolio: &PortfolioState,
    policy: &TradingPolicy,
) -> f64 {
    let mut quantity = match policy.sizing {
        OrderSizing::StrengthScaled { base_fraction } => {
            let mut notional = base_fraction * rec.strength * equity;
            if side == OrderSide::Buy {
                notional = notional.min(available_cash);
            }
            (notional / price).floor()
        }
        OrderSizing::FixedNotional { amount } => (amount / price).floor(),
        OrderSizing::FixedShares { shares } => shares as f64,
    };
    // Sells never exceed the held quantity, but a sell against no position
    // is still surfaced to the risk filter so the rejection is recorded.
    if side == OrderSide::Sell {
        if let Some(position) = portfolio.position(&rec.symbol) {
            quantity = quantity.min(position.quantity.floor());
        }
    }
    quantity
}

/// Candidate cut down to the whole-share headroom under the position cap.
fn resize_to_cap(
    order: &Order,
    price: f64,
    equity: f64,
    portfolio: &PortfolioState,
    policy: &TradingPolicy,
) -> Option<Order> {
    let held_value = portfolio
        .position(&order.symbol)
        .map_or(0.0, |p| p.market_value(price));
    let headroom = policy.position_cap(equity) - held_value;
    let quantity = (headroom / price).floor();
    if quantity < 1.0 {
        return None;
    }
    Some(Order::market(order.id.clone(), order.cycle, &order.symbol, order.side, quantity))
}

fn summarize_rationale(rec: &AggregatedRecommendation) -> String {
    let lead = rec
        .contributing
        .iter()
        .find(|s| s.action == rec.net_action)
        .or_else(|| rec.contributing.first());
    match lead {
        Some(signal) => format!(
            "{} of {} analysts agree; {}: {}",
            rec.contributing.iter().filter(|s| s.action == rec.net_action).count(),
            rec.contributing.len(),
            signal.analyst,
            signal.rationale
        ),
        None => String::from("no contributing signals"),
    }
}
