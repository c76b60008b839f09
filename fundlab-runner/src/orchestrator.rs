//! Cycle orchestrator — the state machine driving one trading cycle.
//!
//! Phases run strictly in order: gathering, aggregating, deciding,
//! executing, reconciling. A cycle never aborts. Whatever goes wrong mid
//! cycle (a panicking analyst, a dead feed, a venue outage, a fill that
//! contradicts the books) is absorbed, recorded as a [`DegradedReason`],
//! and the cycle still finishes with a snapshot and an audit record.
//!
//! Determinism: symbols are visited in lexicographic order, analysts in
//! roster order, and orders carry sequential per-cycle ids, so two runs
//! with the same inputs produce identical records (timestamps aside).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fundlab_core::aggregate::{aggregate, AggregatedRecommendation};
use fundlab_core::analysts::{default_roster, Analyst};
use fundlab_core::cycle::{CyclePhase, CycleRecord, DegradedReason, ExecutionOutcome};
use fundlab_core::decision::{decide, DecisionBatch};
use fundlab_core::domain::{
    CycleId, Fill, InstrumentUniverse, MarketContext, Order, OrderStatus, PortfolioState, Signal,
};
use fundlab_core::policy::TradingPolicy;
use log::{debug, error, info, warn};
use tokio::time::{timeout, Instant};

use crate::audit::AuditSink;
use crate::broker::{ExecutionAdapter, ExecutionReport};
use crate::market::MarketDataProvider;

pub struct CycleOrchestrator {
    universe: InstrumentUniverse,
    policy: TradingPolicy,
    analysts: Vec<Arc<dyn Analyst>>,
    market: Arc<dyn MarketDataProvider>,
    adapter: Arc<dyn ExecutionAdapter>,
    audit: Arc<dyn AuditSink>,
    portfolio: PortfolioState,
    next_cycle: CycleId,
}

impl CycleOrchestrator {
    pub fn new(
        universe: InstrumentUniverse,
        policy: TradingPolicy,
        market: Arc<dyn MarketDataProvider>,
        adapter: Arc<dyn ExecutionAdapter>,
        audit: Arc<dyn AuditSink>,
        portfolio: PortfolioState,
    ) -> Self {
        let analysts = default_roster().into_iter().map(Arc::from).collect();
        Self {
            universe,
            policy,
            analysts,
            market,
            adapter,
            audit,
            portfolio,
            next_cycle: CycleId(0),
        }
    }

    /// Replace the analyst roster; used by tests to inject failing analysts.
    pub fn with_analysts(mut self, analysts: Vec<Arc<dyn Analyst>>) -> Self {
        self.analysts = analysts;
        self
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    /// Manual operator action after investigating a reconciliation failure.
    pub fn clear_block(&mut self, symbol: &str) -> bool {
        self.portfolio.clear_block(symbol)
    }

    /// Run one complete cycle. Infallible: degradation is recorded, never
    /// returned as an error.
    pub async fn run_cycle(&mut self) -> CycleRecord {
        let cycle = self.next_cycle;
        self.next_cycle = cycle.next();
        let started_at = Utc::now();
        let mut degraded_reasons: Vec<DegradedReason> = Vec::new();

        debug!("cycle {cycle} phase {}", CyclePhase::Gathering);
        let (signals, contexts) = self.gather(cycle, &mut degraded_reasons).await;

        debug!("cycle {cycle} phase {}", CyclePhase::Aggregating);
        let recommendations = self.aggregate_all(&signals);

        debug!("cycle {cycle} phase {}", CyclePhase::Deciding);
        let prices: HashMap<String, f64> = contexts
            .iter()
            .map(|(symbol, ctx)| (symbol.clone(), ctx.last_price))
            .collect();
        let batch = decide(
            &recommendations,
            &self.portfolio,
            &prices,
            &self.universe,
            &self.policy,
            cycle,
        );

        debug!("cycle {cycle} phase {}", CyclePhase::Executing);
        let (executions, fills) = self.execute(cycle, &batch, &prices, &mut degraded_reasons).await;

        debug!("cycle {cycle} phase {}", CyclePhase::Reconciling);
        self.reconcile(&fills, &mut degraded_reasons);

        let finished_at = Utc::now();
        let snapshot = self.portfolio.snapshot(&prices, finished_at);
        let mut record = CycleRecord {
            cycle,
            phase: CyclePhase::Complete,
            started_at,
            finished_at,
            policy_fingerprint: self.policy.fingerprint(),
            degraded: !degraded_reasons.is_empty(),
            degraded_reasons,
            signals,
            recommendations,
            decisions: batch.decisions,
            orders: batch.orders,
            executions,
            fills,
            snapshot,
        };

        if let Err(e) = self.audit.append(&record) {
            error!("cycle {cycle}: audit append failed: {e}");
            record.degraded = true;
            record
                .degraded_reasons
                .push(DegradedReason::AuditFailure { cause: e.to_string() });
        }

        info!(
            "cycle {cycle} {}: {} signals, {} orders, {} fills, equity {:.2}",
            if record.degraded { "degraded" } else { "complete" },
            record.signals.len(),
            record.order_count(),
            record.fill_count(),
            record.snapshot.equity
        );
        record
    }

    /// Fetch one context per symbol and one signal per (symbol, analyst).
    ///
    /// Analyst evaluation runs on the blocking pool under the per-analyst
    /// timeout; a panic or timeout downgrades that one signal to Hold.
    async fn gather(
        &self,
        _cycle: CycleId,
        degraded: &mut Vec<DegradedReason>,
    ) -> (Vec<Signal>, HashMap<String, MarketContext>) {
        let analyst_budget = Duration::from_millis(self.policy.analyst_timeout_ms);
        let mut signals = Vec::with_capacity(self.universe.len() * self.analysts.len());
        let mut contexts = HashMap::new();

        for instrument in self.universe.iter() {
            let symbol = instrument.symbol.clone();
            let ctx = match self.market.fetch(&symbol).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!("{symbol}: {e}; downgrading all signals to hold");
                    degraded.push(DegradedReason::DataUnavailable { symbol: symbol.clone() });
                    let now = Utc::now();
                    for analyst in &self.analysts {
                        signals.push(Signal::hold(
                            analyst.id(),
                            &symbol,
                            "market data unavailable",
                            now,
                        ));
                    }
                    continue;
                }
            };

            let handles: Vec<_> = self
                .analysts
                .iter()
                .map(|analyst| {
                    let analyst = Arc::clone(analyst);
                    let ctx = ctx.clone();
                    tokio::task::spawn_blocking(move || analyst.evaluate(&ctx))
                })
                .collect();

            for (analyst, handle) in self.analysts.iter().zip(handles) {
                let signal = match timeout(analyst_budget, handle).await {
                    Ok(Ok(signal)) => signal,
                    Ok(Err(join_err)) => {
                        let cause = if join_err.is_panic() { "panicked" } else { "cancelled" };
                        warn!("analyst {} {} on {}", analyst.id(), cause, symbol);
                        degraded.push(DegradedReason::AnalystFailure {
                            analyst: analyst.id(),
                            symbol: symbol.clone(),
                            cause: cause.to_string(),
                        });
                        Signal::hold(analyst.id(), &symbol, cause, Utc::now())
                    }
                    Err(_) => {
                        let cause = format!("timed out after {}ms", self.policy.analyst_timeout_ms);
                        warn!("analyst {} {} on {}", analyst.id(), cause, symbol);
                        degraded.push(DegradedReason::AnalystFailure {
                            analyst: analyst.id(),
                            symbol: symbol.clone(),
                            cause: cause.clone(),
                        });
                        Signal::hold(analyst.id(), &symbol, cause, Utc::now())
                    }
                };
                signals.push(signal);
            }
            contexts.insert(symbol, ctx);
        }
        (signals, contexts)
    }

    /// One recommendation per universe symbol, in symbol order.
    fn aggregate_all(&self, signals: &[Signal]) -> Vec<AggregatedRecommendation> {
        self.universe
            .iter()
            .map(|instrument| {
                let relevant: Vec<Signal> = signals
                    .iter()
                    .filter(|s| s.symbol == instrument.symbol)
                    .cloned()
                    .collect();
                aggregate(&instrument.symbol, &relevant, &self.policy.tie_break)
            })
            .collect()
    }

    /// Submit orders sequentially under the shared cycle deadline.
    ///
    /// Orders are registered as open before submission. Once the deadline
    /// expires, the in-flight submission and every order still pending are
    /// cancelled rather than left dangling.
    async fn execute(
        &mut self,
        _cycle: CycleId,
        batch: &DecisionBatch,
        prices: &HashMap<String, f64>,
        degraded: &mut Vec<DegradedReason>,
    ) -> (Vec<ExecutionOutcome>, Vec<Fill>) {
        let deadline = Instant::now() + Duration::from_millis(self.policy.cycle_deadline_ms);
        let mut executions = Vec::with_capacity(batch.orders.len());
        let mut fills = Vec::new();

        for order in &batch.orders {
            self.portfolio.register_order(order);
        }

        let mut expired = false;
        for order in &batch.orders {
            if expired {
                self.cancel(order, "cycle deadline exceeded before submission", &mut executions);
                degraded.push(DegradedReason::ExecutionTimeout { order_id: order.id.clone() });
                continue;
            }
            let price = prices.get(&order.symbol).copied().unwrap_or(0.0);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                expired = true;
                self.cancel(order, "cycle deadline exceeded before submission", &mut executions);
                degraded.push(DegradedReason::ExecutionTimeout { order_id: order.id.clone() });
                continue;
            }
            match timeout(remaining, self.adapter.submit(order, price)).await {
                Ok(Ok(ExecutionReport::Filled(fill))) => {
                    executions.push(ExecutionOutcome {
                        order_id: order.id.clone(),
                        status: OrderStatus::Filled,
                    });
                    fills.push(fill);
                }
                Ok(Ok(ExecutionReport::Rejected { reason })) => {
                    info!("order {} rejected by venue: {reason}", order.id);
                    self.portfolio.complete_order(&order.id);
                    executions.push(ExecutionOutcome {
                        order_id: order.id.clone(),
                        status: OrderStatus::Rejected { reason },
                    });
                }
                Ok(Err(e)) => {
                    warn!("order {} execution failed: {e}", order.id);
                    degraded.push(DegradedReason::ExecutionFailure {
                        order_id: order.id.clone(),
                        cause: e.to_string(),
                    });
                    self.cancel(order, "execution adapter failed", &mut executions);
                }
                Err(_) => {
                    expired = true;
                    degraded.push(DegradedReason::ExecutionTimeout { order_id: order.id.clone() });
                    self.cancel(order, "cycle deadline exceeded in flight", &mut executions);
                }
            }
        }
        (executions, fills)
    }

    fn cancel(&mut self, order: &Order, reason: &str, executions: &mut Vec<ExecutionOutcome>) {
        warn!("order {} cancelled: {reason}", order.id);
        self.portfolio.complete_order(&order.id);
        executions.push(ExecutionOutcome {
            order_id: order.id.clone(),
            status: OrderStatus::Cancelled { reason: reason.to_string() },
        });
    }

    /// Apply fills in report order. A refused fill blocks its symbol and
    /// degrades the cycle; the remaining fills still apply.
    fn reconcile(&mut self, fills: &[Fill], degraded: &mut Vec<DegradedReason>) {
        for fill in fills {
            match self.portfolio.apply_fill(fill) {
                Ok(applied) => {
                    debug!(
                        "fill {} applied: cash delta {:.2}, realized {:.2}",
                        fill.id, applied.cash_delta, applied.realized_pnl
                    );
                }
                Err(e) => {
                    error!("fill {} refused: {e}", fill.id);
                    // The order got its terminal report; only the fill is
                    // refused. Leaving it open would grow the index forever.
                    self.portfolio.complete_order(&fill.order_id);
                    degraded.push(DegradedReason::Reconciliation {
                        symbol: fill.symbol.clone(),
                        cause: e,
                    });
                }
            }
        }
    }
}
