//! Simulated chain adapter for the wallet engine.
//!
//! Implements the [`wallet_engine::AssetAdapter`] capability against an
//! in-memory ledger with deterministic digest-based signing and txids.
//! Used by the engine's integration tests and as a reference for real
//! adapter implementations.

pub mod chain;
pub mod error;
pub mod ledger;

pub use chain::SimChain;
pub use error::SimChainError;
pub use ledger::Ledger;
