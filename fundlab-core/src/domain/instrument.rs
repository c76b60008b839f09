//! Instrument reference data and the tradable universe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable instrument reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub venue: String,
    /// Sector label used by the diversification checks (e.g. "Technology").
    pub sector: String,
    pub tradable: bool,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        venue: impl Into<String>,
        sector: impl Into<String>,
        tradable: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
            sector: sector.into(),
            tradable,
        }
    }
}

/// The instrument universe for a run, keyed by symbol.
///
/// A `BTreeMap` keeps iteration in symbol order so every per-instrument pass
/// in the orchestrator is order-stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentUniverse {
    instruments: BTreeMap<String, Instrument>,
}

impl InstrumentUniverse {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        Self {
            instruments: instruments
                .into_iter()
                .map(|i| (i.symbol.clone(), i))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    pub fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.instruments.get(symbol).map(|i| i.sector.as_str())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Instruments in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }
}
