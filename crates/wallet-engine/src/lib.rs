//! Wallet transaction orchestration.
//!
//! Drives the full lifecycle of a blockchain transfer — construction,
//! signing, verification, and network submission — plus a batched
//! summary (sweep) mode that consolidates funds from many sub-addresses
//! into one destination, optionally paying network fees from a separate
//! fee-support account.
//!
//! Chain specifics (encoding, key handling, transport) stay behind the
//! [`AssetAdapter`] capability; this crate only sequences them.

pub mod adapter;
pub mod error;
pub mod manager;
pub mod transaction;
pub mod types;

mod assembler;
mod pipeline;
mod summary;

pub use adapter::{
    AdapterRegistry, AssetAdapter, BroadcastReceipt, BuiltPayload, FeeFunding, TransferIntent,
};
pub use error::{ErrorKind, WalletError};
pub use manager::WalletManager;
pub use transaction::{
    RawTransaction, RawTransactionWithError, TxState, TxStatus, TxSubmission,
};
pub use types::{Account, FeesSupportAccount, FeesSupportPolicy, SmartContract, TokenBalance};
