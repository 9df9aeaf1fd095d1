use rust_decimal::Decimal;
use thiserror::Error;

use crate::transaction::TxState;

/// Coarse classification of a [`WalletError`], so callers can decide
/// between retrying and aborting without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Retrying with the same input cannot succeed.
    Validation,
    /// The asset adapter failed (balance lookup, construction, signing).
    Adapter,
    /// A pipeline stage was invoked out of order. Programming error.
    State,
    /// Broadcast-side failure. Retry policy belongs to the caller; the
    /// core never re-broadcasts on its own.
    Network,
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unsupported chain symbol: {0}")]
    UnsupportedSymbol(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid fee rate: {0}")]
    InvalidFeeRate(String),

    #[error("Fees-support policy: {0}")]
    FeesSupportPolicy(String),

    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Transaction is {found}, expected {expected}")]
    State { expected: TxState, found: TxState },

    #[error("Broadcast failed: {0}")]
    Network(String),
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::UnknownAccount(_)
            | WalletError::UnsupportedSymbol(_)
            | WalletError::InvalidAmount(_)
            | WalletError::InvalidAddress(_)
            | WalletError::InvalidFeeRate(_)
            | WalletError::FeesSupportPolicy(_) => ErrorKind::Validation,
            WalletError::InsufficientBalance { .. }
            | WalletError::Adapter(_)
            | WalletError::SigningFailed(_)
            | WalletError::VerificationFailed(_) => ErrorKind::Adapter,
            WalletError::State { .. } => ErrorKind::State,
            WalletError::Network(_) => ErrorKind::Network,
        }
    }
}
