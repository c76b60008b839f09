//! Serializable run configuration.
//!
//! A run configures the universe, starting capital, cycle count, RNG seed,
//! audit destination, and the trading policy. Unknown fields are rejected
//! so a typo in a TOML file fails loudly instead of silently meaning the
//! default.

use std::path::{Path, PathBuf};

use fundlab_core::domain::{Instrument, InstrumentUniverse};
use fundlab_core::policy::{PolicyError, TradingPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("universe is empty")]
    EmptyUniverse,
    #[error("duplicate symbol {0} in universe")]
    DuplicateSymbol(String),
    #[error("initial_capital must be positive, got {0}")]
    NonPositiveCapital(f64),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// One instrument row in the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub venue: String,
    pub sector: String,
    #[serde(default = "default_tradable")]
    pub tradable: bool,
}

fn default_tradable() -> bool {
    true
}

/// Full run configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub universe: Vec<InstrumentSpec>,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
    #[serde(default)]
    pub policy: TradingPolicy,
}

fn default_initial_capital() -> f64 {
    500_000.0
}

fn default_cycles() -> u64 {
    1
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("audit.jsonl")
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.universe {
            if !seen.insert(spec.symbol.as_str()) {
                return Err(ConfigError::DuplicateSymbol(spec.symbol.clone()));
            }
        }
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        self.policy.validate()?;
        Ok(())
    }

    pub fn instrument_universe(&self) -> InstrumentUniverse {
        InstrumentUniverse::new(self.universe.iter().map(|spec| {
            Instrument::new(&spec.symbol, &spec.venue, &spec.sector, spec.tradable)
        }))
    }
}
