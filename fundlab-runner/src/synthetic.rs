//! Deterministic synthetic market data.
//!
//! Each symbol gets its own random walk seeded by BLAKE3 over
//! `(master_seed, symbol)`, so series are independent of fetch order and
//! identical across runs with the same seed. The provider holds a tick
//! counter; advancing it extends every walk by one step, which is how the
//! CLI moves "time" forward between cycles.
//!
//! Walks are recomputed from the seed on every fetch rather than cached.
//! That keeps `set_tick` trivially consistent and the provider stateless
//! apart from the counter.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use fundlab_core::domain::{Fundamentals, InstrumentUniverse, MarketContext};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::market::{MarketDataError, MarketDataProvider};

/// History length served with every context; enough for the longest
/// analyst lookback.
const HISTORY_LEN: usize = 260;

/// Symbol key for the market-wide benchmark walk.
const BENCHMARK: &str = "__benchmark__";

pub struct SyntheticMarketData {
    seed: u64,
    universe: InstrumentUniverse,
    tick: AtomicU64,
    unavailable: Mutex<HashSet<String>>,
}

impl SyntheticMarketData {
    pub fn new(seed: u64, universe: InstrumentUniverse) -> Self {
        Self {
            seed,
            universe,
            tick: AtomicU64::new(0),
            unavailable: Mutex::new(HashSet::new()),
        }
    }

    /// Advance the shared clock; every symbol's walk grows by the same steps.
    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    /// Make `symbol` fail every fetch, for degraded-cycle tests.
    pub fn mark_unavailable(&self, symbol: &str) {
        if let Ok(mut set) = self.unavailable.lock() {
            set.insert(symbol.to_string());
        }
    }

    pub fn mark_available(&self, symbol: &str) {
        if let Ok(mut set) = self.unavailable.lock() {
            set.remove(symbol);
        }
    }

    fn sub_seed(&self, symbol: &str, stream: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(stream.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// The walk for `symbol` up to the current tick, oldest first.
    fn closes(&self, symbol: &str, tick: u64) -> Vec<f64> {
        let seed = self.sub_seed(symbol, "walk");
        let mut rng = StdRng::seed_from_u64(seed);
        let start = 20.0 + (seed % 480) as f64;
        let drift = (seed % 7) as f64 * 0.0004 - 0.0012;
        let vol = 0.004 + (seed % 5) as f64 * 0.004;

        let steps = HISTORY_LEN as u64 + tick;
        let mut price = start;
        let mut series = Vec::with_capacity(steps as usize);
        for _ in 0..steps {
            let shock: f64 = rng.gen_range(-1.0..1.0);
            price = (price * (1.0 + drift + vol * shock)).max(0.01);
            series.push(price);
        }
        let keep = series.len().saturating_sub(HISTORY_LEN);
        series.split_off(keep)
    }

    fn fundamentals(&self, symbol: &str) -> Fundamentals {
        let seed = self.sub_seed(symbol, "fundamentals");
        Fundamentals {
            pe_ratio: 6.0 + (seed % 40) as f64,
            dividend_yield: (seed % 5) as f64 * 0.01,
        }
    }

    fn sentiment(&self, symbol: &str, tick: u64) -> f64 {
        let seed = self.sub_seed(symbol, "sentiment").wrapping_add(tick);
        let mut rng = StdRng::seed_from_u64(seed);
        rng.gen_range(-1.0..1.0)
    }

    /// Trailing 20-step return of the shared benchmark walk.
    fn benchmark_return(&self, tick: u64) -> Option<f64> {
        let closes = self.closes(BENCHMARK, tick);
        let window = 20;
        if closes.len() <= window {
            return None;
        }
        let last = *closes.last()?;
        let base = closes[closes.len() - 1 - window];
        if base <= 0.0 {
            return None;
        }
        Some(last / base - 1.0)
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketContext, MarketDataError> {
        if self
            .unavailable
            .lock()
            .map(|set| set.contains(symbol))
            .unwrap_or(false)
        {
            return Err(MarketDataError::Unavailable {
                symbol: symbol.to_string(),
                cause: "feed marked offline".into(),
            });
        }
        let instrument = self.universe.get(symbol).ok_or_else(|| MarketDataError::Unavailable {
            symbol: symbol.to_string(),
            cause: "not in universe".into(),
        })?;

        let tick = self.tick();
        let closes = self.closes(symbol, tick);
        let last_price = closes.last().copied().unwrap_or(0.0);
        let volume = 1_000_000.0
            + (self.sub_seed(symbol, "volume").wrapping_add(tick) % 9_000_000) as f64;

        Ok(MarketContext {
            symbol: symbol.to_string(),
            sector: instrument.sector.clone(),
            as_of: Utc::now(),
            last_price,
            volume,
            closes,
            fundamentals: Some(self.fundamentals(symbol)),
            sentiment: Some(self.sentiment(symbol, tick)),
            benchmark_return: self.benchmark_return(tick),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlab_core::domain::Instrument;

    fn universe() -> InstrumentUniverse {
        InstrumentUniverse::new([
            Instrument::new("AAPL", "NASDAQ", "Technology", true),
            Instrument::new("JPM", "NYSE", "Financial", true),
        ])
    }

    #[tokio::test]
    async fn same_seed_same_series() {
        let a = SyntheticMarketData::new(42, universe());
        let b = SyntheticMarketData::new(42, universe());
        let ca = a.fetch("AAPL").await.unwrap();
        let cb = b.fetch("AAPL").await.unwrap();
        assert_eq!(ca.closes, cb.closes);
        assert_eq!(ca.sentiment, cb.sentiment);
    }

    #[tokio::test]
    async fn different_symbols_diverge() {
        let data = SyntheticMarketData::new(42, universe());
        let aapl = data.fetch("AAPL").await.unwrap();
        let jpm = data.fetch("JPM").await.unwrap();
        assert_ne!(aapl.closes, jpm.closes);
    }

    #[tokio::test]
    async fn advancing_tick_extends_the_walk() {
        let data = SyntheticMarketData::new(7, universe());
        let before = data.fetch("AAPL").await.unwrap();
        data.set_tick(1);
        let after = data.fetch("AAPL").await.unwrap();

        assert_eq!(before.closes.len(), after.closes.len());
        // The new last close continues the same walk: the previous last
        // close is now second-to-last.
        assert_eq!(
            before.closes.last(),
            after.closes.get(after.closes.len() - 2)
        );
    }

    #[tokio::test]
    async fn unavailable_symbol_errors() {
        let data = SyntheticMarketData::new(1, universe());
        data.mark_unavailable("AAPL");
        assert!(data.fetch("AAPL").await.is_err());
        data.mark_available("AAPL");
        assert!(data.fetch("AAPL").await.is_ok());
    }

    #[tokio::test]
    async fn context_is_complete_for_analysts() {
        let data = SyntheticMarketData::new(9, universe());
        let ctx = data.fetch("AAPL").await.unwrap();
        assert_eq!(ctx.closes.len(), HISTORY_LEN);
        assert_eq!(ctx.last_price, *ctx.closes.last().unwrap());
        assert!(ctx.fundamentals.is_some());
        assert!(ctx.sentiment.is_some());
        assert!(ctx.benchmark_return.is_some());
    }
}
