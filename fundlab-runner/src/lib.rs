//! FundLab Runner — cycle orchestration around the decision core.
//!
//! This crate builds on `fundlab-core` to provide:
//! - The cycle orchestrator state machine (gather → aggregate → decide →
//!   execute → reconcile), which always runs to completion
//! - Collaborator seams: market data providers and execution adapters
//! - A deterministic synthetic market data source for offline runs
//! - A paper broker that fills market orders at the hinted price
//! - A JSON Lines audit trail and snapshot-based portfolio bootstrap
//! - TOML run configuration

pub mod audit;
pub mod bootstrap;
pub mod broker;
pub mod config;
pub mod market;
pub mod orchestrator;
pub mod paper;
pub mod synthetic;

pub use audit::{AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use bootstrap::bootstrap_portfolio;
pub use broker::{ExecutionAdapter, ExecutionError, ExecutionReport};
pub use config::{ConfigError, InstrumentSpec, RunConfig};
pub use market::{MarketDataError, MarketDataProvider};
pub use orchestrator::CycleOrchestrator;
pub use paper::PaperBroker;
pub use synthetic::SyntheticMarketData;
