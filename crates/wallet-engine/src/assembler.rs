//! Builds an unsigned raw transaction for a single transfer.

use rust_decimal::Decimal;
use tracing::debug;

use crate::adapter::{AssetAdapter, BuiltPayload, FeeFunding, TransferIntent};
use crate::error::WalletError;
use crate::transaction::{RawTransaction, TxStatus};
use crate::types::{parse_positive_decimal, Account, SmartContract};

/// Resolve a caller-supplied fee rate. Empty means "use the adapter's
/// current estimate".
pub(crate) fn resolve_fee_rate(
    adapter: &dyn AssetAdapter,
    fee_rate: &str,
) -> Result<Decimal, WalletError> {
    let fee_rate = fee_rate.trim();
    if fee_rate.is_empty() {
        return adapter.default_fee_rate();
    }
    let parsed = fee_rate
        .parse::<Decimal>()
        .map_err(|e| WalletError::InvalidFeeRate(format!("{fee_rate:?}: {e}")))?;
    if parsed <= Decimal::ZERO {
        return Err(WalletError::InvalidFeeRate(format!(
            "fee rate must be positive, got {parsed}"
        )));
    }
    Ok(parsed)
}

/// Turn a constructed adapter payload into the pipeline's starting
/// artifact. Always `Unsigned`.
pub(crate) fn raw_from_built(
    intent: &TransferIntent<'_>,
    fee_rate: Decimal,
    built: BuiltPayload,
) -> RawTransaction {
    RawTransaction {
        wallet_id: intent.account.wallet_id.clone(),
        account_id: intent.account.account_id.clone(),
        symbol: intent.account.symbol.clone(),
        from_address: intent.from_address.map(str::to_string),
        to: intent.to.to_string(),
        amount: intent.amount,
        fee_rate,
        fees: built.fees,
        memo: intent.memo.map(str::to_string),
        contract: intent.contract.cloned(),
        fee_support_tx: None,
        status: TxStatus::Unsigned {
            payload: built.payload,
        },
    }
}

/// Assemble a single transfer from `account` to `to`.
///
/// Validates the inputs, prechecks the spendable balance, then delegates
/// input selection and byte-level construction to the adapter. Failures
/// are surfaced to the caller, never retried here.
pub(crate) fn assemble(
    adapter: &dyn AssetAdapter,
    account: &Account,
    amount: &str,
    to: &str,
    fee_rate: &str,
    memo: &str,
    contract: Option<&SmartContract>,
) -> Result<RawTransaction, WalletError> {
    let amount = parse_positive_decimal("amount", amount)?;
    if !adapter.is_valid_address(to) {
        return Err(WalletError::InvalidAddress(to.to_string()));
    }
    let fee_rate = resolve_fee_rate(adapter, fee_rate)?;

    // Precheck the transferred asset only. The native fee on top is the
    // builder's concern; it knows the exact fee once inputs are selected.
    let available = match contract {
        Some(contract) => adapter.token_balance(account, contract)?.balance,
        None => adapter.account_balance(account)?,
    };
    if available < amount {
        return Err(WalletError::InsufficientBalance {
            available,
            required: amount,
        });
    }

    let intent = TransferIntent {
        account,
        from_address: None,
        to,
        amount,
        fee_rate: Some(fee_rate),
        contract,
        memo: (!memo.is_empty()).then_some(memo),
        fee_funding: FeeFunding::FromBalance,
    };
    let built = adapter.build_raw_transaction(&intent)?;
    debug!(
        "assembled transfer: {} {} from account {} to {} (fee {})",
        amount, account.symbol, account.account_id, to, built.fees
    );
    Ok(raw_from_built(&intent, fee_rate, built))
}
