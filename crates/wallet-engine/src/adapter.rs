//! The per-chain capability boundary.
//!
//! Concrete chains implement [`AssetAdapter`]; the core never sees chain
//! bytes, only the opaque `serde_json::Value` payloads the adapter builds,
//! signs, and broadcasts. Adapters are registered once at startup in an
//! [`AdapterRegistry`] keyed by chain symbol and treated as immutable
//! afterward.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::WalletError;
use crate::types::{Account, SmartContract, TokenBalance};

/// Where a transfer's network fee comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFunding {
    /// The sender pays the fee on top of the amount. Regular transfers.
    FromBalance,
    /// The fee is deducted from the transfer amount. Native sweeps that
    /// empty an address have nothing left to pay the fee from.
    FromAmount,
    /// A fee-support transfer delivers the fee to the sender before this
    /// transaction settles, so the fee is not checked against the
    /// sender's current balance at construction time.
    Supported,
}

/// One transfer the adapter is asked to price or construct.
#[derive(Debug, Clone)]
pub struct TransferIntent<'a> {
    pub account: &'a Account,
    /// Spend from this single address instead of letting the adapter
    /// select inputs across the account. Used by sweeps.
    pub from_address: Option<&'a str>,
    pub to: &'a str,
    pub amount: Decimal,
    pub fee_rate: Option<Decimal>,
    pub contract: Option<&'a SmartContract>,
    pub memo: Option<&'a str>,
    pub fee_funding: FeeFunding,
}

/// Result of raw transaction construction.
#[derive(Debug, Clone)]
pub struct BuiltPayload {
    /// Builder-specific payload, opaque to the orchestration core.
    pub payload: Value,
    /// Network fee the builder committed to.
    pub fees: Decimal,
}

/// Identifiers assigned by the network on broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastReceipt {
    pub tx_id: String,
    pub wx_id: String,
}

/// Per-blockchain implementation of balance lookup, fee estimation,
/// construction, signing delegation, verification, and broadcast.
///
/// Calls that cross the network or touch key storage are blocking from
/// the core's perspective.
pub trait AssetAdapter: Send + Sync {
    /// Chain symbol this adapter serves, e.g. `"BTC"`.
    fn symbol(&self) -> &str;

    /// Native balance across all of the account's addresses.
    fn account_balance(&self, account: &Account) -> Result<Decimal, WalletError>;

    /// Token balance across all of the account's addresses.
    fn token_balance(
        &self,
        account: &Account,
        contract: &SmartContract,
    ) -> Result<TokenBalance, WalletError>;

    /// Balance of a single address, native or token.
    fn address_balance(
        &self,
        address: &str,
        contract: Option<&SmartContract>,
    ) -> Result<Decimal, WalletError>;

    /// Syntactic address validity for this chain.
    fn is_valid_address(&self, address: &str) -> bool;

    /// Fee rate used when the caller supplies none.
    fn default_fee_rate(&self) -> Result<Decimal, WalletError>;

    /// Estimated network fee for the intent, without constructing it.
    fn estimate_fee(&self, intent: &TransferIntent<'_>) -> Result<Decimal, WalletError>;

    /// Minimum sweepable amount; sweeps below this are skipped.
    fn dust_threshold(&self) -> Decimal;

    /// Select inputs and build the unsigned payload.
    fn build_raw_transaction(
        &self,
        intent: &TransferIntent<'_>,
    ) -> Result<BuiltPayload, WalletError>;

    /// Sign the payload with the account's credential.
    fn sign(&self, payload: Value, credential: &str) -> Result<Value, WalletError>;

    /// Validate a signed payload locally — signature correctness and
    /// structural well-formedness. No network interaction.
    fn verify(&self, payload: &Value) -> Result<(), WalletError>;

    /// Broadcast the signed payload to the network.
    fn broadcast(&self, payload: &Value) -> Result<BroadcastReceipt, WalletError>;
}

/// Process-wide adapter table, keyed by chain symbol.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn AssetAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own symbol. Last registration for a
    /// symbol wins.
    pub fn register(&mut self, adapter: Arc<dyn AssetAdapter>) {
        self.adapters
            .insert(adapter.symbol().to_string(), adapter);
    }

    pub fn get(&self, symbol: &str) -> Result<&Arc<dyn AssetAdapter>, WalletError> {
        self.adapters
            .get(symbol)
            .ok_or_else(|| WalletError::UnsupportedSymbol(symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullAdapter {
        symbol: &'static str,
    }

    impl AssetAdapter for NullAdapter {
        fn symbol(&self) -> &str {
            self.symbol
        }
        fn account_balance(&self, _: &Account) -> Result<Decimal, WalletError> {
            Ok(Decimal::ZERO)
        }
        fn token_balance(
            &self,
            _: &Account,
            contract: &SmartContract,
        ) -> Result<TokenBalance, WalletError> {
            Ok(TokenBalance {
                contract: contract.clone(),
                balance: Decimal::ZERO,
            })
        }
        fn address_balance(
            &self,
            _: &str,
            _: Option<&SmartContract>,
        ) -> Result<Decimal, WalletError> {
            Ok(Decimal::ZERO)
        }
        fn is_valid_address(&self, _: &str) -> bool {
            true
        }
        fn default_fee_rate(&self) -> Result<Decimal, WalletError> {
            Ok(Decimal::ZERO)
        }
        fn estimate_fee(&self, _: &TransferIntent<'_>) -> Result<Decimal, WalletError> {
            Ok(Decimal::ZERO)
        }
        fn dust_threshold(&self) -> Decimal {
            Decimal::ZERO
        }
        fn build_raw_transaction(
            &self,
            _: &TransferIntent<'_>,
        ) -> Result<BuiltPayload, WalletError> {
            Err(WalletError::Adapter("null adapter".into()))
        }
        fn sign(&self, payload: Value, _: &str) -> Result<Value, WalletError> {
            Ok(payload)
        }
        fn verify(&self, _: &Value) -> Result<(), WalletError> {
            Ok(())
        }
        fn broadcast(&self, _: &Value) -> Result<BroadcastReceipt, WalletError> {
            Err(WalletError::Network("null adapter".into()))
        }
    }

    #[test]
    fn registry_dispatches_by_symbol() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(NullAdapter { symbol: "AAA" }));
        registry.register(Arc::new(NullAdapter { symbol: "BBB" }));

        assert_eq!(registry.get("AAA").unwrap().symbol(), "AAA");
        assert_eq!(registry.get("BBB").unwrap().symbol(), "BBB");
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let registry = AdapterRegistry::new();
        assert!(matches!(
            registry.get("NOPE"),
            Err(WalletError::UnsupportedSymbol(_))
        ));
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(NullAdapter { symbol: "AAA" }));
        registry.register(Arc::new(NullAdapter { symbol: "AAA" }));
        assert_eq!(registry.symbols().count(), 1);
    }
}
