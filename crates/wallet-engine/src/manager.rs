//! The orchestrator. Routes every operation to the adapter matching the
//! account's chain symbol and sequences the pipeline. Holds no
//! transaction state of its own beyond the dispatch tables.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::adapter::{AdapterRegistry, AssetAdapter};
use crate::error::WalletError;
use crate::transaction::{RawTransaction, RawTransactionWithError, TxSubmission};
use crate::types::{Account, FeesSupportAccount, SmartContract, TokenBalance};
use crate::{assembler, pipeline, summary};

pub struct WalletManager {
    registry: AdapterRegistry,
    /// Dispatch table keyed by (wallet id, account id). Registration
    /// happens at startup; persistence lives outside the core.
    accounts: HashMap<(String, String), Account>,
    /// One lock per fee-support account id, serializing support-transfer
    /// construction so concurrent summaries cannot double-spend the
    /// support balance.
    support_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WalletManager {
    pub fn new() -> Self {
        Self {
            registry: AdapterRegistry::new(),
            accounts: HashMap::new(),
            support_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Register a chain adapter. Call during startup only; the registry
    /// is read-only once operations begin.
    pub fn register_adapter(&mut self, adapter: Arc<dyn AssetAdapter>) {
        info!("registered adapter for {}", adapter.symbol());
        self.registry.register(adapter);
    }

    pub fn register_account(&mut self, account: Account) {
        debug!(
            "registered account {} under wallet {} ({} addresses)",
            account.account_id,
            account.wallet_id,
            account.addresses.len()
        );
        self.accounts.insert(
            (account.wallet_id.clone(), account.account_id.clone()),
            account,
        );
    }

    pub fn account(&self, wallet_id: &str, account_id: &str) -> Result<&Account, WalletError> {
        self.accounts
            .get(&(wallet_id.to_string(), account_id.to_string()))
            .ok_or_else(|| {
                WalletError::UnknownAccount(format!("{account_id} (wallet {wallet_id})"))
            })
    }

    fn resolve(
        &self,
        wallet_id: &str,
        account_id: &str,
    ) -> Result<(&Account, &Arc<dyn AssetAdapter>), WalletError> {
        let account = self.account(wallet_id, account_id)?;
        let adapter = self.registry.get(&account.symbol)?;
        Ok((account, adapter))
    }

    // ─── Balance queries ─────────────────────────────────────────────

    pub fn get_assets_account_balance(
        &self,
        wallet_id: &str,
        account_id: &str,
    ) -> Result<Decimal, WalletError> {
        let (account, adapter) = self.resolve(wallet_id, account_id)?;
        adapter.account_balance(account)
    }

    pub fn get_assets_account_token_balance(
        &self,
        wallet_id: &str,
        account_id: &str,
        contract: &SmartContract,
    ) -> Result<TokenBalance, WalletError> {
        let (account, adapter) = self.resolve(wallet_id, account_id)?;
        adapter.token_balance(account, contract)
    }

    // ─── Transaction construction ────────────────────────────────────

    /// Build an unsigned transfer of `amount` from the account to `to`.
    /// An empty `fee_rate` means the adapter's current estimate.
    #[allow(clippy::too_many_arguments)]
    pub fn create_transaction(
        &self,
        wallet_id: &str,
        account_id: &str,
        amount: &str,
        to: &str,
        fee_rate: &str,
        memo: &str,
        contract: Option<&SmartContract>,
    ) -> Result<RawTransaction, WalletError> {
        let (account, adapter) = self.resolve(wallet_id, account_id)?;
        assembler::assemble(adapter.as_ref(), account, amount, to, fee_rate, memo, contract)
    }

    /// Plan sweeps of the account's addresses in `[start, start+limit)`
    /// toward `summary_address`. Per-address failures are isolated in
    /// the returned entries; only call-level validation fails the call.
    #[allow(clippy::too_many_arguments)]
    pub fn create_summary_raw_transaction_with_error(
        &self,
        wallet_id: &str,
        account_id: &str,
        summary_address: &str,
        min_transfer: &str,
        retained_balance: &str,
        fee_rate: &str,
        start: usize,
        limit: usize,
        contract: Option<&SmartContract>,
        fee_support: Option<&FeesSupportAccount>,
    ) -> Result<Vec<RawTransactionWithError>, WalletError> {
        let (account, adapter) = self.resolve(wallet_id, account_id)?;
        let support = match fee_support {
            Some(support) => {
                let support_account = self.account(wallet_id, &support.account_id)?;
                // The support account must live on the sweep's chain, or
                // its transfers would be built by the wrong adapter.
                if support_account.symbol != account.symbol {
                    return Err(WalletError::FeesSupportPolicy(format!(
                        "support account {} is on {}, sweep account on {}",
                        support.account_id, support_account.symbol, account.symbol
                    )));
                }
                Some((support, support_account))
            }
            None => None,
        };

        // Serialize support-transfer construction per support account.
        let lock = fee_support.map(|s| self.support_lock(&s.account_id));
        let _guard = lock
            .as_ref()
            .map(|l| l.lock().unwrap_or_else(PoisonError::into_inner));

        summary::plan(
            adapter.as_ref(),
            &summary::SummaryRequest {
                account,
                summary_address,
                min_transfer,
                retained_balance,
                fee_rate,
                start,
                limit,
                contract,
                fee_support: support,
            },
        )
    }

    fn support_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .support_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ─── Pipeline stages ─────────────────────────────────────────────

    /// Sign an unsigned transaction (and its fee-support sub-transfer)
    /// with the wallet credential. Retry-safe on credential failure.
    pub fn sign_transaction(
        &self,
        wallet_id: &str,
        account_id: &str,
        password: &str,
        raw_tx: &mut RawTransaction,
    ) -> Result<(), WalletError> {
        let (_, adapter) = self.resolve(wallet_id, account_id)?;
        pipeline::sign(adapter.as_ref(), password, raw_tx)
    }

    /// Locally validate a signed transaction. No network interaction;
    /// failures here indicate an assembly or signing defect.
    pub fn verify_transaction(
        &self,
        wallet_id: &str,
        account_id: &str,
        raw_tx: &mut RawTransaction,
    ) -> Result<(), WalletError> {
        let (_, adapter) = self.resolve(wallet_id, account_id)?;
        pipeline::verify(adapter.as_ref(), raw_tx)
    }

    /// Broadcast a verified transaction. The fee-support sub-transfer,
    /// if any, goes out first. Not retried by the core.
    pub fn submit_transaction(
        &self,
        wallet_id: &str,
        account_id: &str,
        raw_tx: &mut RawTransaction,
    ) -> Result<TxSubmission, WalletError> {
        let (_, adapter) = self.resolve(wallet_id, account_id)?;
        pipeline::submit(adapter.as_ref(), raw_tx)
    }
}

impl Default for WalletManager {
    fn default() -> Self {
        Self::new()
    }
}
