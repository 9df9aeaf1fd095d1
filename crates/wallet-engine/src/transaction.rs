//! The raw transaction artifact and its pipeline state machine.
//!
//! A [`RawTransaction`] moves through `Unsigned -> Signed -> Verified ->
//! Submitted`, terminal at `Submitted`. The stage payloads live inside the
//! [`TxStatus`] tag, so a transaction cannot hold (say) a network txid
//! while still unsigned — illegal orderings fail with a state error
//! instead of silently reordering.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WalletError;
use crate::types::SmartContract;

/// Pipeline stage of a raw transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Unsigned,
    Signed,
    Verified,
    Submitted,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxState::Unsigned => "unsigned",
            TxState::Signed => "signed",
            TxState::Verified => "verified",
            TxState::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

/// Stage tag plus the stage's payload. The builder-specific payload is
/// opaque to the core; only the owning adapter interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TxStatus {
    Unsigned { payload: Value },
    Signed { payload: Value },
    Verified { payload: Value },
    Submitted { tx_id: String, wx_id: String },
}

impl TxStatus {
    pub fn state(&self) -> TxState {
        match self {
            TxStatus::Unsigned { .. } => TxState::Unsigned,
            TxStatus::Signed { .. } => TxState::Signed,
            TxStatus::Verified { .. } => TxState::Verified,
            TxStatus::Submitted { .. } => TxState::Submitted,
        }
    }
}

/// A transfer under construction or in flight. Owned by exactly one
/// account; amounts are decimals parsed losslessly from strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub wallet_id: String,
    pub account_id: String,
    pub symbol: String,
    /// Set for sweeps, which spend from a single address. `None` lets the
    /// adapter select inputs across the whole account.
    pub from_address: Option<String>,
    pub to: String,
    pub amount: Decimal,
    /// Resolved fee rate (caller-supplied or adapter default).
    pub fee_rate: Decimal,
    /// Network fee estimated by the adapter at construction time.
    pub fees: Decimal,
    pub memo: Option<String>,
    pub contract: Option<SmartContract>,
    /// Auxiliary transfer advancing this transaction's fee from a
    /// fee-support account. Must reach the network before its sweep.
    pub fee_support_tx: Option<Box<RawTransaction>>,
    pub(crate) status: TxStatus,
}

impl RawTransaction {
    pub fn state(&self) -> TxState {
        self.status.state()
    }

    /// Adapter payload for the current stage, if any. `None` once
    /// submitted.
    pub fn payload(&self) -> Option<&Value> {
        match &self.status {
            TxStatus::Unsigned { payload }
            | TxStatus::Signed { payload }
            | TxStatus::Verified { payload } => Some(payload),
            TxStatus::Submitted { .. } => None,
        }
    }

    /// Network transaction id. Non-empty exactly when submitted.
    pub fn tx_id(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Submitted { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }

    /// Network-assigned wire identifier. Non-empty exactly when submitted.
    pub fn wx_id(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Submitted { wx_id, .. } => Some(wx_id),
            _ => None,
        }
    }

    pub(crate) fn expect_state(&self, expected: TxState) -> Result<(), WalletError> {
        let found = self.state();
        if found == expected {
            Ok(())
        } else {
            Err(WalletError::State { expected, found })
        }
    }
}

/// Outcome of one address in a summary batch. A failing address records
/// its error here instead of aborting the batch.
#[derive(Debug, Clone)]
pub struct RawTransactionWithError {
    /// The sweeping address this entry was planned for.
    pub address: String,
    pub result: Result<RawTransaction, WalletError>,
}

impl RawTransactionWithError {
    pub fn raw_tx(&self) -> Option<&RawTransaction> {
        self.result.as_ref().ok()
    }

    pub fn raw_tx_mut(&mut self) -> Option<&mut RawTransaction> {
        self.result.as_mut().ok()
    }

    pub fn error(&self) -> Option<&WalletError> {
        self.result.as_ref().err()
    }
}

/// Identifiers returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxSubmission {
    pub tx_id: String,
    pub wx_id: String,
}
