//! The strict sign -> verify -> submit pipeline.
//!
//! Each stage requires the exact preceding state and fails fast with a
//! state error otherwise. A failed stage leaves the transaction where it
//! was: signing is retry-safe with a corrected credential, verification
//! failures indicate a local construction or signing defect, and
//! submission is never retried by the core (re-broadcast is the caller's
//! decision).
//!
//! A sweep's fee-support sub-transfer rides along: it is signed and
//! verified with its sweep and broadcast first, so the sweep never
//! reaches the network unfunded.

use tracing::{debug, info};

use crate::adapter::AssetAdapter;
use crate::error::WalletError;
use crate::transaction::{RawTransaction, TxState, TxStatus, TxSubmission};

pub(crate) fn sign(
    adapter: &dyn AssetAdapter,
    credential: &str,
    raw: &mut RawTransaction,
) -> Result<(), WalletError> {
    if let Some(support) = raw.fee_support_tx.as_deref_mut() {
        // Already-signed support transfers are left alone so a retry of
        // the main transaction does not trip the state machine.
        if support.state() == TxState::Unsigned {
            sign_one(adapter, credential, support)?;
        }
    }
    sign_one(adapter, credential, raw)
}

fn sign_one(
    adapter: &dyn AssetAdapter,
    credential: &str,
    raw: &mut RawTransaction,
) -> Result<(), WalletError> {
    let payload = match &raw.status {
        TxStatus::Unsigned { payload } => payload.clone(),
        other => {
            return Err(WalletError::State {
                expected: TxState::Unsigned,
                found: other.state(),
            })
        }
    };
    let signed = adapter.sign(payload, credential)?;
    raw.status = TxStatus::Signed { payload: signed };
    debug!("signed transaction to {} ({})", raw.to, raw.symbol);
    Ok(())
}

pub(crate) fn verify(
    adapter: &dyn AssetAdapter,
    raw: &mut RawTransaction,
) -> Result<(), WalletError> {
    if let Some(support) = raw.fee_support_tx.as_deref_mut() {
        if support.state() == TxState::Signed {
            verify_one(adapter, support)?;
        }
    }
    verify_one(adapter, raw)
}

fn verify_one(adapter: &dyn AssetAdapter, raw: &mut RawTransaction) -> Result<(), WalletError> {
    let payload = match &raw.status {
        TxStatus::Signed { payload } => payload.clone(),
        other => {
            return Err(WalletError::State {
                expected: TxState::Signed,
                found: other.state(),
            })
        }
    };
    adapter.verify(&payload)?;
    raw.status = TxStatus::Verified { payload };
    debug!("verified transaction to {} ({})", raw.to, raw.symbol);
    Ok(())
}

pub(crate) fn submit(
    adapter: &dyn AssetAdapter,
    raw: &mut RawTransaction,
) -> Result<TxSubmission, WalletError> {
    // The sweep itself must be ready before anything reaches the network.
    raw.expect_state(TxState::Verified)?;
    if let Some(support) = raw.fee_support_tx.as_deref_mut() {
        if support.state() != TxState::Submitted {
            submit_one(adapter, support)?;
        }
    }
    submit_one(adapter, raw)
}

fn submit_one(
    adapter: &dyn AssetAdapter,
    raw: &mut RawTransaction,
) -> Result<TxSubmission, WalletError> {
    let payload = match &raw.status {
        TxStatus::Verified { payload } => payload.clone(),
        other => {
            return Err(WalletError::State {
                expected: TxState::Verified,
                found: other.state(),
            })
        }
    };
    let receipt = adapter.broadcast(&payload)?;
    raw.status = TxStatus::Submitted {
        tx_id: receipt.tx_id.clone(),
        wx_id: receipt.wx_id.clone(),
    };
    info!(
        "submitted transaction to {} ({}): txid {}",
        raw.to, raw.symbol, receipt.tx_id
    );
    Ok(TxSubmission {
        tx_id: receipt.tx_id,
        wx_id: receipt.wx_id,
    })
}
