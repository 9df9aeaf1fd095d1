//! End-to-end summary (sweep) tests: plan a batch over an account's
//! addresses, then drive every entry through sign -> verify -> submit,
//! including the fee-support variants.

use std::sync::Arc;

use chain_sim::SimChain;
use rust_decimal::Decimal;
use wallet_engine::{
    Account, FeesSupportAccount, SmartContract, TxState, WalletError, WalletManager,
};

const PASSWORD: &str = "correct-horse";

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup(addresses: &[&str]) -> (WalletManager, Arc<SimChain>) {
    let chain = Arc::new(SimChain::new("SIM").with_credential(PASSWORD));
    let mut manager = WalletManager::new();
    manager.register_adapter(chain.clone());
    manager.register_account(Account::new(
        "wallet1",
        "account1",
        "SIM",
        addresses.iter().map(|a| a.to_string()).collect(),
    ));
    (manager, chain)
}

fn register_support_account(manager: &mut WalletManager, address: &str) {
    manager.register_account(Account::new(
        "wallet1",
        "accountFees",
        "SIM",
        vec![address.to_string()],
    ));
}

/// Sign, verify, and submit every successful entry, as a caller would.
fn drive_entries(
    manager: &WalletManager,
    entries: &mut [wallet_engine::RawTransactionWithError],
) {
    for entry in entries {
        let Some(raw_tx) = entry.raw_tx_mut() else {
            continue;
        };
        manager
            .sign_transaction("wallet1", "account1", PASSWORD, raw_tx)
            .unwrap();
        manager
            .verify_transaction("wallet1", "account1", raw_tx)
            .unwrap();
        manager
            .submit_transaction("wallet1", "account1", raw_tx)
            .unwrap();
        assert_eq!(raw_tx.state(), TxState::Submitted);
        assert!(raw_tx.tx_id().is_some());
    }
}

#[test]
fn only_addresses_above_dust_are_swept() {
    // Balances [0.001, 50, 0] against the default dust threshold of
    // 0.01: exactly one sweep entry.
    let (manager, chain) =
        setup(&["simAddrSweep001", "simAddrSweep002", "simAddrSweep003"]);
    chain.fund("simAddrSweep001", dec("0.001"));
    chain.fund("simAddrSweep002", dec("50"));

    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            None,
            None,
        )
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, "simAddrSweep002");

    drive_entries(&manager, &mut entries);

    // The swept address is emptied; the destination receives the swept
    // amount minus the network fee it funded.
    let fee = entries[0].raw_tx().unwrap().fees;
    assert_eq!(chain.native_balance("simAddrSweep002"), Decimal::ZERO);
    assert_eq!(
        chain.native_balance("simSummaryAddr01"),
        dec("50") - fee
    );
    // The dust address was left alone.
    assert_eq!(chain.native_balance("simAddrSweep001"), dec("0.001"));
}

#[test]
fn partial_failure_still_sweeps_the_rest() {
    let (manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrSweep002", dec("10"));
    chain.fail_builds_from("simAddrSweep001");

    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            None,
            None,
        )
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].error().is_some());
    assert!(entries[1].raw_tx().is_some());

    drive_entries(&manager, &mut entries);
    assert!(chain.native_balance("simSummaryAddr01") > Decimal::ZERO);
    // The failing address keeps its funds.
    assert_eq!(chain.native_balance("simAddrSweep001"), dec("10"));
}

#[test]
fn fee_support_advances_fees_for_every_sweep() {
    let (mut manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrSweep002", dec("20"));
    chain.fund("simAddrFees0001", dec("5"));
    register_support_account(&mut manager, "simAddrFees0001");

    let support = FeesSupportAccount::proportional("accountFees", "1").unwrap();
    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            None,
            Some(&support),
        )
        .unwrap();
    assert_eq!(entries.len(), 2);

    let support_balance = dec("5");
    let mut total_contribution = Decimal::ZERO;
    for entry in &entries {
        let support_tx = entry.raw_tx().unwrap().fee_support_tx.as_deref().unwrap();
        assert_eq!(support_tx.account_id, "accountFees");
        total_contribution += support_tx.amount;
    }
    assert!(total_contribution <= support_balance);

    drive_entries(&manager, &mut entries);

    for entry in &entries {
        let tx = entry.raw_tx().unwrap();
        let support_tx = tx.fee_support_tx.as_deref().unwrap();
        assert_eq!(support_tx.state(), TxState::Submitted);
    }
    // Fees were advanced by the support account, so the destination
    // receives the full swept amounts.
    assert_eq!(chain.native_balance("simSummaryAddr01"), dec("30"));
    assert_eq!(chain.native_balance("simAddrSweep001"), Decimal::ZERO);
    assert_eq!(chain.native_balance("simAddrSweep002"), Decimal::ZERO);
}

#[test]
fn token_sweep_with_fee_support_needs_no_native_on_swept_addresses() {
    let (mut manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    // Token holdings only; fees come from the support account.
    chain.fund_token("simAddrSweep001", "contractAddr0001", dec("7"));
    chain.fund_token("simAddrSweep002", "contractAddr0001", dec("3"));
    chain.fund("simAddrFees0001", dec("1"));
    register_support_account(&mut manager, "simAddrFees0001");

    let contract = SmartContract {
        address: "contractAddr0001".into(),
        symbol: "SIM".into(),
        name: "Test Omni".into(),
        token: "OMNI".into(),
        decimals: 8,
    };
    let support = FeesSupportAccount::proportional("accountFees", "1").unwrap();

    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            Some(&contract),
            Some(&support),
        )
        .unwrap();
    assert_eq!(entries.len(), 2);

    drive_entries(&manager, &mut entries);
    assert_eq!(
        chain.token_balance_of("simSummaryAddr01", "contractAddr0001"),
        dec("10")
    );
}

#[test]
fn fixed_support_amount_is_constant_per_sweep() {
    let (mut manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrSweep002", dec("20"));
    chain.fund("simAddrFees0001", dec("5"));
    register_support_account(&mut manager, "simAddrFees0001");

    let support = FeesSupportAccount::fixed("accountFees", "0.5").unwrap();
    let entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            None,
            Some(&support),
        )
        .unwrap();

    for entry in &entries {
        let support_tx = entry.raw_tx().unwrap().fee_support_tx.as_deref().unwrap();
        assert_eq!(support_tx.amount, dec("0.5"));
    }
}

#[test]
fn conflicting_support_policy_is_rejected_before_any_adapter_call() {
    let err = FeesSupportAccount::from_fields("accountFees", Some("1"), Some("0.01"))
        .unwrap_err();
    assert!(matches!(err, WalletError::FeesSupportPolicy(_)));

    let err = FeesSupportAccount::from_fields("accountFees", None, None).unwrap_err();
    assert!(matches!(err, WalletError::FeesSupportPolicy(_)));
}

#[test]
fn unknown_support_account_fails_the_call() {
    let (manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));

    let support = FeesSupportAccount::proportional("ghostAccount", "1").unwrap();
    let err = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            100,
            None,
            Some(&support),
        )
        .unwrap_err();
    assert!(matches!(err, WalletError::UnknownAccount(_)));
}

#[test]
fn pagination_windows_compose() {
    let addresses: Vec<String> = (0..5).map(|i| format!("simAddrPage000{i}")).collect();
    let address_refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
    let (manager, chain) = setup(&address_refs);
    for address in &addresses {
        chain.fund(address, dec("1"));
    }

    let first = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            3,
            None,
            None,
        )
        .unwrap();
    let second = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            3,
            3,
            None,
            None,
        )
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 2);
    let seen: Vec<&str> = first
        .iter()
        .chain(second.iter())
        .map(|e| e.address.as_str())
        .collect();
    assert_eq!(seen, address_refs);
}

#[test]
fn window_past_the_end_is_empty() {
    let (manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));

    let entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            10,
            3,
            None,
            None,
        )
        .unwrap();
    assert!(entries.is_empty());
}

#[test]
fn retained_balance_stays_on_each_address() {
    let (manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));

    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "2",
            "",
            0,
            50,
            None,
            None,
        )
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].raw_tx().unwrap().amount, dec("8"));
    drive_entries(&manager, &mut entries);

    assert_eq!(chain.native_balance("simAddrSweep001"), dec("2"));
    // A native sweep nets its fee out of the swept amount.
    assert_eq!(chain.native_balance("simSummaryAddr01"), dec("7.999"));
}

#[test]
fn over_committed_support_budget_fails_the_remainder() {
    let (mut manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrSweep002", dec("10"));
    chain.fund("simAddrFees0001", dec("5.5"));
    register_support_account(&mut manager, "simAddrFees0001");

    // A fixed advance of 5 per sweep: the 5.5 balance covers one entry
    // (5 plus the support transfer's own 0.001 fee) but not two.
    let support = FeesSupportAccount::from_fields("accountFees", None, Some("5")).unwrap();
    let entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            50,
            None,
            Some(&support),
        )
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries[0].raw_tx().is_some());
    let err = entries[1].error().unwrap();
    assert_eq!(err.kind(), wallet_engine::ErrorKind::Adapter);
    assert!(err.to_string().contains("exhausted"));
}

#[test]
fn zero_proportional_scale_builds_no_support_transfer() {
    let (mut manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrFees0001", dec("5"));
    register_support_account(&mut manager, "simAddrFees0001");

    let support = FeesSupportAccount::from_fields("accountFees", Some("0"), None).unwrap();
    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            50,
            None,
            Some(&support),
        )
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries[0].raw_tx().unwrap().fee_support_tx.is_none());

    // Without an advance the sweep funds itself, netting the fee out of
    // the swept amount.
    drive_entries(&manager, &mut entries);
    assert_eq!(chain.native_balance("simAddrSweep001"), dec("0"));
    assert_eq!(chain.native_balance("simSummaryAddr01"), dec("9.999"));
    assert_eq!(chain.native_balance("simAddrFees0001"), dec("5"));
}

#[test]
fn partial_proportional_support_nets_the_rest_from_the_sweep() {
    let (mut manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrFees0001", dec("5"));
    register_support_account(&mut manager, "simAddrFees0001");

    // Half the 0.001 fee is advanced; the other half comes out of the
    // swept amount, so the address still empties exactly.
    let support = FeesSupportAccount::from_fields("accountFees", Some("0.5"), None).unwrap();
    let mut entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            50,
            None,
            Some(&support),
        )
        .unwrap();

    assert_eq!(entries.len(), 1);
    let raw_tx = entries[0].raw_tx().unwrap();
    assert_eq!(raw_tx.amount, dec("9.9995"));
    let support_tx = raw_tx.fee_support_tx.as_deref().unwrap();
    assert_eq!(support_tx.amount, dec("0.0005"));

    drive_entries(&manager, &mut entries);
    assert_eq!(chain.native_balance("simAddrSweep001"), dec("0"));
    assert_eq!(chain.native_balance("simSummaryAddr01"), dec("9.9995"));
    // The support account paid the advance plus its own transfer fee.
    assert_eq!(chain.native_balance("simAddrFees0001"), dec("4.9985"));
}

#[test]
fn support_account_on_another_chain_is_rejected() {
    let (mut manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));
    manager.register_account(Account::new(
        "wallet1",
        "accountFees",
        "OTHER",
        vec!["otherAddrFees01".to_string()],
    ));

    let support = FeesSupportAccount::from_fields("accountFees", Some("1"), None).unwrap();
    let err = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            50,
            None,
            Some(&support),
        )
        .unwrap_err();
    assert!(matches!(err, WalletError::FeesSupportPolicy(_)));
}

#[test]
fn failed_sweep_build_returns_its_support_draw() {
    let (mut manager, chain) = setup(&["simAddrSweep001", "simAddrSweep002"]);
    chain.fund("simAddrSweep001", dec("10"));
    chain.fund("simAddrSweep002", dec("10"));
    chain.fund("simAddrFees0001", dec("5.5"));
    register_support_account(&mut manager, "simAddrFees0001");
    chain.fail_builds_from("simAddrSweep001");

    // The 5.5 support balance covers a single advance of 5. The first
    // entry fails to build, so its advance must still be available to
    // the second.
    let support = FeesSupportAccount::from_fields("accountFees", None, Some("5")).unwrap();
    let entries = manager
        .create_summary_raw_transaction_with_error(
            "wallet1",
            "account1",
            "simSummaryAddr01",
            "",
            "",
            "",
            0,
            50,
            None,
            Some(&support),
        )
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries[0].error().is_some());
    let raw_tx = entries[1].raw_tx().unwrap();
    assert!(raw_tx.fee_support_tx.is_some());
}

#[test]
fn invalid_summary_address_fails_the_whole_call() {
    let (manager, chain) = setup(&["simAddrSweep001"]);
    chain.fund("simAddrSweep001", dec("10"));

    let err = manager
        .create_summary_raw_transaction_with_error(
            "wallet1", "account1", "???", "", "", "", 0, 50, None, None,
        )
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}
