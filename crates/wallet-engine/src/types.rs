use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// A wallet sub-ledger for one chain symbol.
///
/// Accounts are created elsewhere (account creation is out of scope for
/// the orchestration core) and registered with the wallet manager, which
/// references them by id in every transaction operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub wallet_id: String,
    pub account_id: String,
    /// Chain symbol, used to dispatch to the matching asset adapter.
    pub symbol: String,
    /// Human-readable label. Not used for dispatch.
    pub alias: String,
    /// Receiving addresses owned by this account, in derivation order.
    pub addresses: Vec<String>,
}

impl Account {
    pub fn new(
        wallet_id: impl Into<String>,
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        addresses: Vec<String>,
    ) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            account_id: account_id.into(),
            symbol: symbol.into(),
            alias: String::new(),
            addresses,
        }
    }
}

/// Token descriptor. When present on a call, balance/transfer/fee
/// semantics apply to the token, not the chain's native asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContract {
    /// Contract address on the chain.
    pub address: String,
    /// Chain symbol the contract lives on.
    pub symbol: String,
    pub name: String,
    pub token: String,
    pub decimals: u8,
}

/// Token balance of an account, as returned by token balance queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract: SmartContract,
    pub balance: Decimal,
}

/// How a fee-support account contributes toward a sweep's network fee.
/// Exactly one policy is active per call; the sum type makes the
/// "both set" configuration unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeesSupportPolicy {
    /// Contribution is `estimated_fee * scale`, with scale in [0, 1].
    Proportional(Decimal),
    /// Contribution is a constant amount regardless of the estimated fee.
    Fixed(Decimal),
}

/// A designated account that advances network fees on behalf of sweeping
/// addresses. Ephemeral: supplied per summary call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesSupportAccount {
    pub account_id: String,
    pub policy: FeesSupportPolicy,
}

impl FeesSupportAccount {
    pub fn proportional(
        account_id: impl Into<String>,
        scale: &str,
    ) -> Result<Self, WalletError> {
        let scale = parse_decimal("fees-support scale", scale)?;
        if scale < Decimal::ZERO || scale > Decimal::ONE {
            return Err(WalletError::FeesSupportPolicy(format!(
                "scale must be in [0, 1], got {scale}"
            )));
        }
        Ok(Self {
            account_id: account_id.into(),
            policy: FeesSupportPolicy::Proportional(scale),
        })
    }

    pub fn fixed(account_id: impl Into<String>, amount: &str) -> Result<Self, WalletError> {
        let amount = parse_decimal("fees-support amount", amount)?;
        if amount <= Decimal::ZERO {
            return Err(WalletError::FeesSupportPolicy(format!(
                "fixed amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            account_id: account_id.into(),
            policy: FeesSupportPolicy::Fixed(amount),
        })
    }

    /// Build from the loosely-typed wire form where both policies are
    /// optional string fields. Supplying both, or neither, is a
    /// configuration error and is rejected before any adapter call.
    pub fn from_fields(
        account_id: impl Into<String>,
        scale: Option<&str>,
        fixed_amount: Option<&str>,
    ) -> Result<Self, WalletError> {
        let scale = scale.filter(|s| !s.is_empty());
        let fixed_amount = fixed_amount.filter(|s| !s.is_empty());
        match (scale, fixed_amount) {
            (Some(scale), None) => Self::proportional(account_id, scale),
            (None, Some(amount)) => Self::fixed(account_id, amount),
            (Some(_), Some(_)) => Err(WalletError::FeesSupportPolicy(
                "scale and fixed amount are mutually exclusive".into(),
            )),
            (None, None) => Err(WalletError::FeesSupportPolicy(
                "either scale or fixed amount is required".into(),
            )),
        }
    }
}

/// Lossless decimal parsing for amount-like inputs. `label` names the
/// field in the error message.
pub(crate) fn parse_decimal(label: &str, value: &str) -> Result<Decimal, WalletError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| WalletError::InvalidAmount(format!("{label} {value:?}: {e}")))
}

/// Like [`parse_decimal`] but requires a strictly positive value.
pub(crate) fn parse_positive_decimal(label: &str, value: &str) -> Result<Decimal, WalletError> {
    let parsed = parse_decimal(label, value)?;
    if parsed <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "{label} must be positive, got {parsed}"
        )));
    }
    Ok(parsed)
}
