//! Fundlab Core — multi-analyst decision engine for paper trading.
//!
//! This crate contains the deterministic heart of the system:
//! - Domain types (instruments, market contexts, signals, orders, fills, positions)
//! - Eight analyst strategies behind one polymorphic trait
//! - Confidence-weighted signal aggregation with deterministic tie-breaking
//! - Risk & diversification filter composed from independent checks
//! - Fund-manager decision engine (recommendations → sized orders)
//! - Portfolio accounting with a single serialized mutation path
//! - Append-only cycle audit records
//!
//! Everything here is synchronous and free of hidden randomness: given the
//! same market contexts, portfolio snapshot, and policy, the emitted order
//! set is identical across runs. Concurrency, timeouts, and collaborator
//! I/O live in `fundlab-runner`.

pub mod aggregate;
pub mod analysts;
pub mod cycle;
pub mod decision;
pub mod domain;
pub mod policy;
pub mod risk;
