//! Domain types: instruments, market snapshots, signals, orders, fills,
//! positions, and the portfolio aggregate.

pub mod fill;
pub mod ids;
pub mod instrument;
pub mod market;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;

pub use fill::Fill;
pub use ids::{AnalystId, CycleId, FillId, OrderId};
pub use instrument::{Instrument, InstrumentUniverse};
pub use market::{Fundamentals, MarketContext};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use portfolio::{AppliedFill, PortfolioSnapshot, PortfolioState, ReconciliationError};
pub use position::Position;
pub use signal::{Signal, SignalAction};
