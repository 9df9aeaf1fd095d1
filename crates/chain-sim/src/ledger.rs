use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::SimChainError;

/// In-memory balance book: native units per address, token units per
/// (address, contract address).
#[derive(Debug, Default)]
pub struct Ledger {
    native: HashMap<String, Decimal>,
    tokens: HashMap<(String, String), Decimal>,
}

impl Ledger {
    pub fn credit(&mut self, address: &str, amount: Decimal) {
        *self.native.entry(address.to_string()).or_default() += amount;
    }

    pub fn credit_token(&mut self, address: &str, contract: &str, amount: Decimal) {
        *self
            .tokens
            .entry((address.to_string(), contract.to_string()))
            .or_default() += amount;
    }

    pub fn native_balance(&self, address: &str) -> Decimal {
        self.native.get(address).copied().unwrap_or_default()
    }

    pub fn token_balance(&self, address: &str, contract: &str) -> Decimal {
        self.tokens
            .get(&(address.to_string(), contract.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Debit `amount` across `addresses` greedily, in order. Fails
    /// without partial effect when the addresses do not cover it.
    pub fn debit_spread(
        &mut self,
        addresses: &[String],
        amount: Decimal,
        contract: Option<&str>,
    ) -> Result<(), SimChainError> {
        let available: Decimal = addresses
            .iter()
            .map(|a| match contract {
                Some(c) => self.token_balance(a, c),
                None => self.native_balance(a),
            })
            .sum();
        if available < amount {
            return Err(SimChainError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let mut remaining = amount;
        for address in addresses {
            if remaining.is_zero() {
                break;
            }
            let balance = match contract {
                Some(c) => self.token_balance(address, c),
                None => self.native_balance(address),
            };
            let take = balance.min(remaining);
            if take.is_zero() {
                continue;
            }
            match contract {
                Some(c) => {
                    *self
                        .tokens
                        .entry((address.clone(), c.to_string()))
                        .or_default() -= take;
                }
                None => {
                    *self.native.entry(address.clone()).or_default() -= take;
                }
            }
            remaining -= take;
        }
        Ok(())
    }
}
