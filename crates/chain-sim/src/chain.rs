//! The simulated chain adapter.
//!
//! A deterministic stand-in for a real chain: balances live in an
//! in-memory [`Ledger`], "signatures" are SHA-256 digests over the
//! canonical payload plus the credential, and broadcast settles the
//! ledger and hands back a digest txid. The point is to exercise the
//! orchestration contract, not to model a chain.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use wallet_engine::{
    Account, AssetAdapter, BroadcastReceipt, BuiltPayload, FeeFunding, SmartContract,
    TokenBalance, TransferIntent, WalletError,
};

use crate::error::SimChainError;
use crate::ledger::Ledger;

const MIN_ADDRESS_LEN: usize = 8;
const MAX_ADDRESS_LEN: usize = 64;

#[derive(Debug, Default)]
struct State {
    ledger: Ledger,
    failing_builds: HashSet<String>,
    broadcast_down: bool,
    seen_txids: HashSet<String>,
    nonce: u64,
}

pub struct SimChain {
    symbol: String,
    fee_rate: Decimal,
    dust: Decimal,
    credential: String,
    state: RwLock<State>,
}

impl SimChain {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            // Flat per-transaction fee; the sim gives every transaction
            // unit weight.
            fee_rate: Decimal::new(1, 3), // 0.001
            dust: Decimal::new(1, 2),     // 0.01
            credential: "sim-credential".to_string(),
            state: RwLock::new(State::default()),
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_dust_threshold(mut self, dust: Decimal) -> Self {
        self.dust = dust;
        self
    }

    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = credential.to_string();
        self
    }

    // ─── Test-harness surface ────────────────────────────────────────

    pub fn fund(&self, address: &str, amount: Decimal) {
        self.write().ledger.credit(address, amount);
    }

    pub fn fund_token(&self, address: &str, contract_address: &str, amount: Decimal) {
        self.write()
            .ledger
            .credit_token(address, contract_address, amount);
    }

    /// Make raw-transaction construction fail for transfers spending
    /// from `address`.
    pub fn fail_builds_from(&self, address: &str) {
        self.write().failing_builds.insert(address.to_string());
    }

    /// Toggle node availability for broadcasts.
    pub fn set_broadcast_failure(&self, down: bool) {
        self.write().broadcast_down = down;
    }

    pub fn native_balance(&self, address: &str) -> Decimal {
        self.read().ledger.native_balance(address)
    }

    pub fn token_balance_of(&self, address: &str, contract_address: &str) -> Decimal {
        self.read().ledger.token_balance(address, contract_address)
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn effective_fee(&self, intent: &TransferIntent<'_>) -> Decimal {
        intent.fee_rate.unwrap_or(self.fee_rate)
    }

    fn digest(&self, body: &Value) -> Result<String, SimChainError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| SimChainError::Payload(format!("unserializable payload: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.update(self.credential.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    fn source_addresses(intent: &TransferIntent<'_>) -> Result<Vec<String>, SimChainError> {
        let sources: Vec<String> = match intent.from_address {
            Some(address) => vec![address.to_string()],
            None => intent.account.addresses.clone(),
        };
        if sources.is_empty() {
            return Err(SimChainError::Build("account has no addresses".into()));
        }
        Ok(sources)
    }
}

fn fee_funding_label(funding: FeeFunding) -> &'static str {
    match funding {
        FeeFunding::FromBalance => "from_balance",
        FeeFunding::FromAmount => "from_amount",
        FeeFunding::Supported => "supported",
    }
}

fn fee_funding_from_label(label: &str) -> Result<FeeFunding, SimChainError> {
    match label {
        "from_balance" => Ok(FeeFunding::FromBalance),
        "from_amount" => Ok(FeeFunding::FromAmount),
        "supported" => Ok(FeeFunding::Supported),
        other => Err(SimChainError::Payload(format!(
            "unknown fee funding {other:?}"
        ))),
    }
}

fn payload_str<'a>(payload: &'a Map<String, Value>, key: &str) -> Result<&'a str, SimChainError> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SimChainError::Payload(format!("missing field {key:?}")))
}

fn payload_decimal(payload: &Map<String, Value>, key: &str) -> Result<Decimal, SimChainError> {
    payload_str(payload, key)?
        .parse()
        .map_err(|e| SimChainError::Payload(format!("field {key:?}: {e}")))
}

impl AssetAdapter for SimChain {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn account_balance(&self, account: &Account) -> Result<Decimal, WalletError> {
        let state = self.read();
        Ok(account
            .addresses
            .iter()
            .map(|a| state.ledger.native_balance(a))
            .sum())
    }

    fn token_balance(
        &self,
        account: &Account,
        contract: &SmartContract,
    ) -> Result<TokenBalance, WalletError> {
        let state = self.read();
        let balance = account
            .addresses
            .iter()
            .map(|a| state.ledger.token_balance(a, &contract.address))
            .sum();
        Ok(TokenBalance {
            contract: contract.clone(),
            balance,
        })
    }

    fn address_balance(
        &self,
        address: &str,
        contract: Option<&SmartContract>,
    ) -> Result<Decimal, WalletError> {
        let state = self.read();
        Ok(match contract {
            Some(contract) => state.ledger.token_balance(address, &contract.address),
            None => state.ledger.native_balance(address),
        })
    }

    fn is_valid_address(&self, address: &str) -> bool {
        (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len())
            && address.chars().all(|c| c.is_ascii_alphanumeric())
    }

    fn default_fee_rate(&self) -> Result<Decimal, WalletError> {
        Ok(self.fee_rate)
    }

    fn estimate_fee(&self, intent: &TransferIntent<'_>) -> Result<Decimal, WalletError> {
        Ok(self.effective_fee(intent))
    }

    fn dust_threshold(&self) -> Decimal {
        self.dust
    }

    fn build_raw_transaction(
        &self,
        intent: &TransferIntent<'_>,
    ) -> Result<BuiltPayload, WalletError> {
        let sources = Self::source_addresses(intent)?;
        let fee = self.effective_fee(intent);
        let mut state = self.write();

        for source in &sources {
            if state.failing_builds.contains(source) {
                return Err(
                    SimChainError::Build(format!("injected build failure for {source}")).into(),
                );
            }
        }

        // Availability check, mirroring what settlement will debit.
        match intent.contract {
            None => {
                let available: Decimal = sources
                    .iter()
                    .map(|a| state.ledger.native_balance(a))
                    .sum();
                let required = match intent.fee_funding {
                    FeeFunding::FromBalance => intent.amount + fee,
                    // Fee comes out of the amount; it has to fit inside.
                    FeeFunding::FromAmount => {
                        if intent.amount <= fee {
                            return Err(SimChainError::Build(format!(
                                "amount {} does not cover fee {}",
                                intent.amount, fee
                            ))
                            .into());
                        }
                        intent.amount
                    }
                    // The fee is in flight from a support transfer.
                    FeeFunding::Supported => intent.amount,
                };
                if available < required {
                    return Err(SimChainError::InsufficientFunds {
                        available,
                        required,
                    }
                    .into());
                }
            }
            Some(contract) => {
                let token_available: Decimal = sources
                    .iter()
                    .map(|a| state.ledger.token_balance(a, &contract.address))
                    .sum();
                if token_available < intent.amount {
                    return Err(SimChainError::InsufficientFunds {
                        available: token_available,
                        required: intent.amount,
                    }
                    .into());
                }
                // The fee stays native even for token transfers.
                if intent.fee_funding != FeeFunding::Supported {
                    let native_available: Decimal = sources
                        .iter()
                        .map(|a| state.ledger.native_balance(a))
                        .sum();
                    if native_available < fee {
                        return Err(SimChainError::InsufficientFunds {
                            available: native_available,
                            required: fee,
                        }
                        .into());
                    }
                }
            }
        }

        state.nonce += 1;
        let payload = json!({
            "chain": self.symbol,
            "from": sources,
            "to": intent.to,
            "amount": intent.amount.to_string(),
            "fee": fee.to_string(),
            "fee_funding": fee_funding_label(intent.fee_funding),
            "contract": intent.contract.map(|c| c.address.clone()),
            "memo": intent.memo,
            "nonce": state.nonce,
        });
        debug!(
            "built {} transfer: {} to {} (fee {}, nonce {})",
            self.symbol, intent.amount, intent.to, fee, state.nonce
        );
        Ok(BuiltPayload {
            payload,
            fees: fee,
        })
    }

    fn sign(&self, payload: Value, credential: &str) -> Result<Value, WalletError> {
        if credential != self.credential {
            return Err(SimChainError::Credential.into());
        }
        let Value::Object(mut body) = payload else {
            return Err(SimChainError::Payload("payload is not an object".into()).into());
        };
        if body.contains_key("signature") {
            return Err(SimChainError::Payload("payload already signed".into()).into());
        }
        let signature = self.digest(&Value::Object(body.clone()))?;
        body.insert("signature".into(), Value::String(signature));
        Ok(Value::Object(body))
    }

    fn verify(&self, payload: &Value) -> Result<(), WalletError> {
        let Value::Object(signed) = payload else {
            return Err(SimChainError::Payload("payload is not an object".into()).into());
        };
        for field in ["from", "to", "amount", "fee", "nonce"] {
            if !signed.contains_key(field) {
                return Err(SimChainError::Payload(format!("missing field {field:?}")).into());
            }
        }
        let signature = payload_str(signed, "signature")?;
        let mut body = signed.clone();
        body.remove("signature");
        let expected = self.digest(&Value::Object(body))?;
        if signature != expected {
            return Err(SimChainError::Signature.into());
        }
        Ok(())
    }

    fn broadcast(&self, payload: &Value) -> Result<BroadcastReceipt, WalletError> {
        // A node would reject an unsigned or tampered transaction.
        self.verify(payload)?;
        let Value::Object(signed) = payload else {
            return Err(SimChainError::Payload("payload is not an object".into()).into());
        };

        let mut state = self.write();
        if state.broadcast_down {
            return Err(SimChainError::Broadcast("node unavailable".into()).into());
        }

        let bytes = serde_json::to_vec(payload)
            .map_err(|e| SimChainError::Payload(format!("unserializable payload: {e}")))?;
        let tx_id = hex::encode(Sha256::digest(&bytes));
        if state.seen_txids.contains(&tx_id) {
            return Err(SimChainError::Broadcast(format!("duplicate transaction {tx_id}")).into());
        }

        let sources: Vec<String> = signed
            .get("from")
            .and_then(Value::as_array)
            .ok_or_else(|| SimChainError::Payload("missing field \"from\"".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        let to = payload_str(signed, "to")?.to_string();
        let amount = payload_decimal(signed, "amount")?;
        let fee = payload_decimal(signed, "fee")?;
        let funding = fee_funding_from_label(payload_str(signed, "fee_funding")?)?;
        let contract = signed.get("contract").and_then(Value::as_str);

        // Settle.
        match contract {
            None => match funding {
                FeeFunding::FromAmount => {
                    state.ledger.debit_spread(&sources, amount, None)?;
                    state.ledger.credit(&to, amount - fee);
                }
                FeeFunding::FromBalance | FeeFunding::Supported => {
                    state.ledger.debit_spread(&sources, amount + fee, None)?;
                    state.ledger.credit(&to, amount);
                }
            },
            Some(contract) => {
                state.ledger.debit_spread(&sources, amount, Some(contract))?;
                state.ledger.debit_spread(&sources, fee, None)?;
                state.ledger.credit_token(&to, contract, amount);
            }
        }

        state.seen_txids.insert(tx_id.clone());
        let wx_id = format!("wx{}", &tx_id[..16]);
        debug!("broadcast {} transfer: txid {}", self.symbol, tx_id);
        Ok(BroadcastReceipt { tx_id, wx_id })
    }
}
