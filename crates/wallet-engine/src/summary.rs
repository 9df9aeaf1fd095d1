//! The sweep planner.
//!
//! Walks a window of an account's addresses, decides which hold enough to
//! sweep, and constructs one transfer per qualifying address toward the
//! summary address. A failing address becomes an error entry; it never
//! aborts the rest of the batch. Optionally, each sweep's network fee is
//! advanced from a separate fee-support account as an auxiliary transfer
//! attached to the sweep.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::adapter::{AssetAdapter, FeeFunding, TransferIntent};
use crate::assembler::{raw_from_built, resolve_fee_rate};
use crate::error::WalletError;
use crate::transaction::RawTransactionWithError;
use crate::types::{parse_decimal, Account, FeesSupportAccount, FeesSupportPolicy, SmartContract};

pub(crate) struct SummaryRequest<'a> {
    pub account: &'a Account,
    pub summary_address: &'a str,
    /// Minimum sweepable amount; empty means the chain's dust threshold.
    pub min_transfer: &'a str,
    /// Balance left behind on each swept address; empty means zero.
    pub retained_balance: &'a str,
    pub fee_rate: &'a str,
    pub start: usize,
    pub limit: usize,
    pub contract: Option<&'a SmartContract>,
    /// The support account paying fees on behalf of sweeping addresses,
    /// resolved to its full [`Account`] by the manager.
    pub fee_support: Option<(&'a FeesSupportAccount, &'a Account)>,
}

/// Remaining spendable balance of the fee-support account across one
/// batch. Entries that would over-commit it fail instead of being built.
struct SupportBudget<'a> {
    support: &'a FeesSupportAccount,
    account: &'a Account,
    remaining: Decimal,
}

pub(crate) fn plan(
    adapter: &dyn AssetAdapter,
    req: &SummaryRequest<'_>,
) -> Result<Vec<RawTransactionWithError>, WalletError> {
    if !adapter.is_valid_address(req.summary_address) {
        return Err(WalletError::InvalidAddress(req.summary_address.to_string()));
    }
    let min_transfer = if req.min_transfer.trim().is_empty() {
        adapter.dust_threshold()
    } else {
        non_negative(parse_decimal("min transfer", req.min_transfer)?)?
    };
    let retained = if req.retained_balance.trim().is_empty() {
        Decimal::ZERO
    } else {
        non_negative(parse_decimal("retained balance", req.retained_balance)?)?
    };
    let fee_rate = resolve_fee_rate(adapter, req.fee_rate)?;

    // The support balance is fetched once; the batch draws it down
    // locally so entries cannot over-commit the account between them.
    let mut budget = match req.fee_support {
        Some((support, account)) => Some(SupportBudget {
            support,
            account,
            remaining: adapter.account_balance(account)?,
        }),
        None => None,
    };

    let addresses = &req.account.addresses;
    let end = req.start.saturating_add(req.limit).min(addresses.len());
    let window = addresses.get(req.start..end).unwrap_or_default();
    info!(
        "planning summary for account {} ({} of {} addresses, min transfer {})",
        req.account.account_id,
        window.len(),
        addresses.len(),
        min_transfer
    );

    let mut entries = Vec::new();
    for address in window {
        let balance = match adapter.address_balance(address, req.contract) {
            Ok(balance) => balance,
            Err(e) => {
                warn!("balance lookup failed for {}: {}", address, e);
                entries.push(RawTransactionWithError {
                    address: address.clone(),
                    result: Err(e),
                });
                continue;
            }
        };
        let sweepable = balance - retained;
        if sweepable < min_transfer {
            debug!(
                "skipping {}: sweepable {} below minimum {}",
                address, sweepable, min_transfer
            );
            continue;
        }

        let result = plan_one(
            adapter,
            req,
            address,
            sweepable,
            fee_rate,
            budget.as_mut(),
        );
        if let Err(e) = &result {
            warn!("sweep construction failed for {}: {}", address, e);
        }
        entries.push(RawTransactionWithError {
            address: address.clone(),
            result,
        });
    }
    Ok(entries)
}

/// Construct one sweep (and its support transfer, if any). Any error
/// here belongs to this entry alone.
fn plan_one(
    adapter: &dyn AssetAdapter,
    req: &SummaryRequest<'_>,
    address: &str,
    sweepable: Decimal,
    fee_rate: Decimal,
    mut budget: Option<&mut SupportBudget<'_>>,
) -> Result<crate::transaction::RawTransaction, WalletError> {
    let native = req.contract.is_none();
    // A native sweep empties the address, so without support the fee can
    // only come out of the swept amount itself.
    let mut fee_funding = if native {
        FeeFunding::FromAmount
    } else {
        FeeFunding::FromBalance
    };
    let mut amount = sweepable;
    let mut support = None;

    if let Some(budget) = budget.as_deref() {
        let fee_intent = TransferIntent {
            account: req.account,
            from_address: Some(address),
            to: req.summary_address,
            amount: sweepable,
            fee_rate: Some(fee_rate),
            contract: req.contract,
            memo: None,
            fee_funding,
        };
        let estimated_fee = adapter.estimate_fee(&fee_intent)?;
        let contribution = match budget.support.policy {
            FeesSupportPolicy::Proportional(scale) => estimated_fee * scale,
            FeesSupportPolicy::Fixed(amount) => amount,
        };
        // A zero contribution (proportional scale 0) builds no support
        // transfer and leaves the sweep funding itself.
        if contribution > Decimal::ZERO {
            support = Some(build_support_transfer(
                adapter,
                budget,
                address,
                contribution,
                fee_rate,
            )?);
            fee_funding = FeeFunding::Supported;
            if native && contribution < estimated_fee {
                // A partial advance covers only part of the fee; the
                // uncovered share is netted out of the swept amount.
                amount = sweepable - (estimated_fee - contribution);
                if amount <= Decimal::ZERO {
                    return Err(WalletError::InsufficientBalance {
                        available: sweepable,
                        required: estimated_fee - contribution,
                    });
                }
            }
        }
    }

    let sweep_intent = TransferIntent {
        account: req.account,
        from_address: Some(address),
        to: req.summary_address,
        amount,
        fee_rate: Some(fee_rate),
        contract: req.contract,
        memo: None,
        fee_funding,
    };
    let built = adapter.build_raw_transaction(&sweep_intent)?;
    let mut raw = raw_from_built(&sweep_intent, fee_rate, built);
    if let Some((support_tx, draw)) = support {
        // The draw lands only once the sweep itself builds, so a failed
        // entry does not starve the rest of the batch.
        if let Some(budget) = budget.as_deref_mut() {
            budget.remaining -= draw;
            debug!(
                "fee support: {} advances {} to {} ({} remaining)",
                budget.account.account_id, support_tx.amount, address, budget.remaining
            );
        }
        raw.fee_support_tx = Some(Box::new(support_tx));
    }
    Ok(raw)
}

fn build_support_transfer(
    adapter: &dyn AssetAdapter,
    budget: &SupportBudget<'_>,
    address: &str,
    contribution: Decimal,
    fee_rate: Decimal,
) -> Result<(crate::transaction::RawTransaction, Decimal), WalletError> {
    let intent = TransferIntent {
        account: budget.account,
        from_address: None,
        to: address,
        amount: contribution,
        fee_rate: Some(fee_rate),
        contract: None,
        memo: None,
        fee_funding: FeeFunding::FromBalance,
    };
    // The support transfer also pays its own network fee, so the draw on
    // the support balance is contribution + fee.
    let support_fee = adapter.estimate_fee(&intent)?;
    if contribution + support_fee > budget.remaining {
        return Err(WalletError::Adapter(format!(
            "fees support account {} exhausted: remaining {}, entry needs {}",
            budget.account.account_id,
            budget.remaining,
            contribution + support_fee
        )));
    }
    let built = adapter.build_raw_transaction(&intent)?;
    let draw = contribution + built.fees;
    Ok((raw_from_built(&intent, fee_rate, built), draw))
}

fn non_negative(value: Decimal) -> Result<Decimal, WalletError> {
    if value < Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "must not be negative, got {value}"
        )));
    }
    Ok(value)
}
