use rust_decimal::Decimal;
use thiserror::Error;

use wallet_engine::WalletError;

/// Simulated chain operation errors.
#[derive(Debug, Error)]
pub enum SimChainError {
    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    #[error("Credential rejected")]
    Credential,

    #[error("Signature mismatch")]
    Signature,

    #[error("Broadcast rejected: {0}")]
    Broadcast(String),
}

impl From<SimChainError> for WalletError {
    fn from(e: SimChainError) -> Self {
        match e {
            SimChainError::Payload(msg) | SimChainError::Build(msg) => {
                WalletError::Adapter(format!("sim: {msg}"))
            }
            SimChainError::InsufficientFunds {
                available,
                required,
            } => WalletError::InsufficientBalance {
                available,
                required,
            },
            SimChainError::Credential => WalletError::SigningFailed("credential rejected".into()),
            SimChainError::Signature => {
                WalletError::VerificationFailed("signature mismatch".into())
            }
            SimChainError::Broadcast(msg) => WalletError::Network(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_engine::ErrorKind;

    #[test]
    fn display_build_error() {
        let err = SimChainError::Build("no addresses".into());
        assert_eq!(err.to_string(), "Build error: no addresses");
    }

    #[test]
    fn conversion_preserves_error_kind() {
        let cases: Vec<(SimChainError, ErrorKind)> = vec![
            (SimChainError::Build("x".into()), ErrorKind::Adapter),
            (SimChainError::Credential, ErrorKind::Adapter),
            (SimChainError::Signature, ErrorKind::Adapter),
            (SimChainError::Broadcast("x".into()), ErrorKind::Network),
        ];
        for (err, kind) in cases {
            assert_eq!(WalletError::from(err).kind(), kind);
        }
    }

    #[test]
    fn insufficient_funds_carries_amounts_across() {
        let err = SimChainError::InsufficientFunds {
            available: "1".parse().unwrap(),
            required: "2".parse().unwrap(),
        };
        match WalletError::from(err) {
            WalletError::InsufficientBalance {
                available,
                required,
            } => {
                assert_eq!(available.to_string(), "1");
                assert_eq!(required.to_string(), "2");
            }
            other => panic!("unexpected conversion: {other:?}"),
        }
    }
}
