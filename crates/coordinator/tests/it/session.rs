use crate::{init_tracing, utils::*};
use alloy_primitives::{Address, U256, address};
use alloy_sol_types::SolCall;
use vault_coordinator::{
    Balance, CallError, ContractCall, CoordinatorError, OperationOutcome, SessionError,
    TransactionState, TxError, TxEvent, TxPhase,
    bindings::{IERC20, IVault},
};
use vault_primitives::{Asset, NetworkId};
use vault_units::{BaseUnits, UnitsError};

const BSC_USDC: Address = address!("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");

fn on(network: NetworkId) -> vault_config::VaultConfig {
    let mut config = config();
    config.active_network = network;
    config
}

#[tokio::test(start_paused = true)]
async fn native_deposit_settles() -> eyre::Result<()> {
    init_tracing();
    let h = Harness::new(on(NetworkId::Base));
    h.fund(None, units("10", 18));
    h.chain.state.lock().fee = units("0.001", 18);

    let outcome = h.session.deposit(Asset::Native, "1.5").await?;
    assert_eq!(outcome, OperationOutcome::Settled { handle: handle(1) });

    let submitted = h.chain.submitted();
    assert_eq!(submitted.len(), 1);
    let (network, call) = &submitted[0];
    assert_eq!(*network, NetworkId::Base);
    let expected =
        ContractCall::new(VAULT, &IVault::depositNativeCall {}).with_value(units("1.5", 18));
    assert_eq!(call, &expected);

    let state = h.session.state(NetworkId::Base);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert_eq!(state.pending_handle(), None);
    assert!(state.has_refreshed_since_confirmation());
    assert_eq!(h.recorder.refreshes(NetworkId::Base), 1);

    let balances = h.session.vault_balances().await?;
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].symbol, NetworkId::Base.native_symbol());
    assert_eq!(balances[0].display, "1.499");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn native_deposit_must_exceed_fee() {
    let h = Harness::new(config());
    h.fund(None, units("10", 18));
    h.chain.state.lock().fee = units("0.001", 18);

    let err = h.session.deposit(Asset::Native, "0.001").await.unwrap_err();
    assert!(matches!(err, SessionError::Tx(TxError::AmountMustExceedFee { .. })), "{err}");
    assert!(h.chain.submitted().is_empty());

    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert_eq!(
        state.last_error(),
        Some(&TxError::AmountMustExceedFee {
            amount: units("0.001", 18),
            fee: units("0.001", 18)
        })
    );
}

#[tokio::test(start_paused = true)]
async fn deposit_needs_wallet_balance() {
    let h = Harness::new(config());
    h.fund(None, units("1", 18));

    let err = h.session.deposit(Asset::Native, "1.000000000000000001").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Tx(TxError::InsufficientBalance { required, available })
            if required == units("1.000000000000000001", 18) && available == units("1", 18)
    ));
    assert!(h.chain.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn zero_amount_is_rejected_before_submission() {
    let h = Harness::new(config());
    h.fund(None, units("1", 18));

    let err = h.session.deposit(Asset::Native, "0.000").await.unwrap_err();
    assert!(matches!(err, SessionError::Tx(TxError::ZeroAmount)));
    assert_eq!(h.session.state(NetworkId::Ethereum).last_error(), Some(&TxError::ZeroAmount));
    assert!(h.chain.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn amount_errors_block_before_anything_starts() {
    let h = Harness::new(config());
    h.fund(Some((USDC, units("500", 6))), U256::ZERO);

    let err = h.session.deposit(Asset::Token(USDC), "1.0000001").await.unwrap_err();
    assert!(matches!(err, SessionError::Amount(UnitsError::PrecisionLoss { decimals: 6, .. })));

    let err = h.session.deposit(Asset::Token(USDC), "-1").await.unwrap_err();
    assert!(matches!(err, SessionError::Amount(UnitsError::InvalidAmount { .. })));

    assert_eq!(h.session.state(NetworkId::Ethereum), TransactionState::default());
    assert!(h.recorder.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn float_amounts_are_reconstituted() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.fund(None, units("1", 18));

    h.session.deposit(Asset::Native, 1.5e-7).await?;
    let submitted = h.chain.submitted();
    assert_eq!(submitted[0].1.value, U256::from(150_000_000_000u64));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn token_deposit_chains_approval() -> eyre::Result<()> {
    init_tracing();
    let h = Harness::new(config());
    h.fund(Some((USDC, units("500", 6))), U256::ZERO);

    let outcome = h.session.deposit(Asset::Token(USDC), "100.5").await?;
    assert_eq!(outcome, OperationOutcome::Settled { handle: handle(2) });

    let amount = U256::from(100_500_000u64);
    let calls: Vec<_> = h.chain.submitted().into_iter().map(|(_, call)| call).collect();
    assert_eq!(
        calls,
        vec![
            ContractCall::new(USDC, &IERC20::approveCall { spender: VAULT, amount }),
            ContractCall::new(VAULT, &IVault::depositTokenCall { token: USDC, amount }),
        ]
    );
    assert_eq!(h.recorder.approvals(), 1);
    assert_eq!(h.recorder.refreshes(NetworkId::Ethereum), 1);

    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.pending_approval(), None);
    assert_eq!(state.phase(), TxPhase::Idle);

    let balances = h.session.vault_balances().await?;
    assert_eq!(
        balances[1],
        Balance {
            asset: Asset::Token(USDC),
            symbol: "USDC".to_string(),
            decimals: 6,
            amount: BaseUnits::from(100_500_000u64),
            display: "100.5".to_string(),
        }
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sufficient_allowance_skips_approval() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.fund(Some((USDC, units("500", 6))), U256::ZERO);
    h.chain.state.lock().allowances.insert((USDC, OWNER, VAULT), U256::MAX);

    let outcome = h.session.deposit(Asset::Token(USDC), "500").await?;
    assert_eq!(outcome, OperationOutcome::Settled { handle: handle(1) });
    assert_eq!(h.chain.signatures(), ["depositToken(address,uint256)"]);
    assert_eq!(h.recorder.approvals(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn approved_deposit_fires_while_allowance_read_lags() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.fund(Some((USDC, units("500", 6))), U256::ZERO);
    // approvals are mined, but allowance reads keep returning the old value
    h.chain.state.lock().ignore_approvals = true;

    let outcome = h.session.deposit(Asset::Token(USDC), "100.5").await?;
    assert_eq!(outcome, OperationOutcome::Settled { handle: handle(2) });
    assert_eq!(
        h.chain.signatures(),
        ["approve(address,uint256)", "depositToken(address,uint256)"]
    );
    assert_eq!(h.recorder.approvals(), 1);
    assert_eq!(h.chain.state.lock().vault[&(OWNER, USDC)], units("100.5", 6));

    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert_eq!(state.last_error(), None);
    assert_eq!(state.pending_approval(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_reads_are_reported_as_preflight_errors() {
    let h = Harness::new(config());
    h.fund(None, units("1", 18));
    h.chain.state.lock().failing_reads.insert(IVault::getCurrentFeeCall::SIGNATURE);

    let err = h.session.deposit(Asset::Native, "0.5").await.unwrap_err();
    let expected = TxError::PreflightRead(CallError::Rpc("node unavailable".to_string()));
    assert!(matches!(&err, SessionError::Tx(e) if *e == expected), "{err}");
    assert!(h.chain.submitted().is_empty());

    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert_eq!(state.last_error(), Some(&expected));
}

#[tokio::test(start_paused = true)]
async fn decimals_follow_the_network() -> eyre::Result<()> {
    let h = Harness::new(on(NetworkId::Bsc));
    h.fund(Some((BSC_USDC, units("500", 18))), U256::ZERO);
    h.chain.state.lock().allowances.insert((BSC_USDC, OWNER, VAULT), U256::MAX);

    h.session.deposit(Asset::Token(BSC_USDC), "100.5").await?;
    let (network, call) = &h.chain.submitted()[0];
    assert_eq!(*network, NetworkId::Bsc);
    assert_eq!(
        call,
        &ContractCall::new(
            VAULT,
            &IVault::depositTokenCall { token: BSC_USDC, amount: units("100.5", 18) }
        )
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn switch_before_approval_confirms_cancels_deposit() -> eyre::Result<()> {
    let h = Harness::held(config());
    h.fund(Some((USDC, units("500", 6))), U256::ZERO);

    let session = h.session.clone();
    let task = tokio::spawn(async move { session.deposit(Asset::Token(USDC), "100.5").await });
    h.chain.submitted.notified().await;
    assert!(h.session.state(NetworkId::Ethereum).pending_approval().is_some());

    h.session.switch_network(NetworkId::Bsc);
    h.watcher.release();

    assert_eq!(task.await??, OperationOutcome::Superseded { handle: Some(handle(1)) });
    assert_eq!(h.chain.signatures(), ["approve(address,uint256)"]);
    assert_eq!(h.recorder.approvals(), 0);
    for network in [NetworkId::Ethereum, NetworkId::Bsc] {
        let state = h.session.state(network);
        assert_eq!(state.phase(), TxPhase::Idle);
        assert_eq!(state.pending_approval(), None);
        assert_eq!(state.last_error(), None);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stale_confirmation_is_not_attributed_to_new_network() -> eyre::Result<()> {
    init_tracing();
    let h = Harness::held(config());
    h.fund(None, units("10", 18));

    let session = h.session.clone();
    let first = tokio::spawn(async move { session.deposit(Asset::Native, "1").await });
    h.chain.submitted.notified().await;

    h.session.switch_network(NetworkId::Base);
    let session = h.session.clone();
    let second = tokio::spawn(async move { session.deposit(Asset::Native, "2").await });
    h.chain.submitted.notified().await;
    assert_eq!(h.session.state(NetworkId::Base).pending_handle(), Some(handle(2)));

    h.watcher.release();
    assert_eq!(first.await??, OperationOutcome::Superseded { handle: Some(handle(1)) });
    assert_eq!(second.await??, OperationOutcome::Settled { handle: handle(2) });

    assert_eq!(h.recorder.refreshes(NetworkId::Base), 1);
    assert_eq!(h.recorder.refreshes(NetworkId::Ethereum), 0);
    let dropped = h.recorder.count(|e| {
        matches!(
            e,
            TxEvent::Dropped { network: NetworkId::Ethereum, reason }
                if *reason == CoordinatorError::InactiveNetwork { network: NetworkId::Ethereum }
        )
    });
    assert_eq!(dropped, 1);

    let eth = h.session.state(NetworkId::Ethereum);
    assert_eq!(eth.phase(), TxPhase::Idle);
    assert_eq!(eth.last_error(), None);
    assert!(!eth.has_refreshed_since_confirmation());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn one_operation_at_a_time() -> eyre::Result<()> {
    let h = Harness::held(config());
    h.fund(None, units("10", 18));

    let session = h.session.clone();
    let task = tokio::spawn(async move { session.deposit(Asset::Native, "1").await });
    h.chain.submitted.notified().await;

    let err = h.session.withdraw(Asset::Native, "1").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Coordinator(CoordinatorError::Busy {
            network: NetworkId::Ethereum,
            phase: TxPhase::Submitted
        })
    ));

    h.watcher.release();
    assert!(task.await??.is_settled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_submission_can_be_retried() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.fund(None, units("10", 18));
    h.chain.state.lock().reject_next = Some(CallError::Rejected("user denied".to_string()));

    let err = h.session.deposit(Asset::Native, "1").await.unwrap_err();
    assert!(matches!(
        &err,
        SessionError::Tx(TxError::SubmissionRejected(reason)) if reason == "user denied"
    ));
    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert!(matches!(state.last_error(), Some(TxError::SubmissionRejected(_))));

    let outcome = h.session.deposit(Asset::Native, "1").await?;
    assert_eq!(outcome, OperationOutcome::Settled { handle: handle(1) });
    assert_eq!(h.session.state(NetworkId::Ethereum).last_error(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watcher_errors_reset_the_network() {
    let h = Harness::new(config());
    h.fund(None, units("10", 18));
    *h.watcher.inclusion_failure.lock() = Some("dropped from mempool".to_string());

    let err = h.session.deposit(Asset::Native, "1").await.unwrap_err();
    let expected = TxError::SubmissionFailed("dropped from mempool".to_string());
    assert!(matches!(&err, SessionError::Tx(e) if *e == expected));
    let state = h.session.state(NetworkId::Ethereum);
    assert_eq!(state.phase(), TxPhase::Idle);
    assert_eq!(state.pending_handle(), None);
    assert_eq!(state.last_error(), Some(&expected));

    *h.watcher.inclusion_failure.lock() = None;
    *h.watcher.finality_failure.lock() = Some(CallError::Rpc("timeout".to_string()));
    let err = h.session.deposit(Asset::Native, "1").await.unwrap_err();
    assert!(matches!(
        &err,
        SessionError::Tx(TxError::SubmissionFailed(reason)) if reason == "rpc error: timeout"
    ));
    assert_eq!(h.recorder.refreshes(NetworkId::Ethereum), 0);
}

#[tokio::test(start_paused = true)]
async fn withdraw_needs_vault_balance() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.chain.state.lock().vault.insert((OWNER, USDC), units("50", 6));

    let err = h.session.withdraw(Asset::Token(USDC), "50.000001").await.unwrap_err();
    assert!(matches!(err, SessionError::Tx(TxError::InsufficientBalance { .. })));

    let outcome = h.session.withdraw(Asset::Token(USDC), "20").await?;
    assert!(outcome.is_settled());
    assert_eq!(h.chain.signatures(), ["withdrawToken(address,uint256)"]);

    let wallet = h.session.wallet_balance(Asset::Token(USDC)).await?;
    assert_eq!(wallet.display, "20");
    assert_eq!(wallet.amount, BaseUnits::from(20_000_000u64));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn internal_transfer() -> eyre::Result<()> {
    let h = Harness::new(config());
    h.chain.state.lock().vault.insert((OWNER, Address::ZERO), units("5", 18));

    for recipient in [Address::ZERO, OWNER] {
        let err = h.session.transfer_internal(Asset::Native, recipient, "1").await.unwrap_err();
        assert!(matches!(err, SessionError::Tx(TxError::InvalidRecipient(to)) if to == recipient));
    }
    assert!(h.chain.submitted().is_empty());

    h.session.transfer_internal(Asset::Native, OTHER, "1.25").await?;
    assert_eq!(h.chain.signatures(), ["transferInternalNative(address,uint256)"]);
    let state = h.chain.state.lock();
    assert_eq!(state.vault[&(OTHER, Address::ZERO)], units("1.25", 18));
    assert_eq!(state.vault[&(OWNER, Address::ZERO)], units("3.75", 18));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_token_metadata_falls_back() -> eyre::Result<()> {
    let mut config = config();
    config.default_decimals = 9;
    let h = Harness::new(config);
    h.fund(Some((DUST, units("1", 18))), U256::ZERO);

    let balance = h.session.wallet_balance(Asset::Token(DUST)).await?;
    assert_eq!(balance.decimals, 9);
    assert_eq!(balance.symbol, "ERC20");
    assert_eq!(balance.display, "1000000000");

    h.chain.state.lock().metadata.insert(DUST, (18, "DUST".to_string()));
    let balance = h.session.wallet_balance(Asset::Token(DUST)).await?;
    assert_eq!(balance.decimals, 18);
    assert_eq!(balance.symbol, "DUST");
    assert_eq!(balance.display, "1");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn balances_use_display_settings() -> eyre::Result<()> {
    let mut config = config();
    config.display.max_fraction_digits = 2;
    config.display.group_thousands = true;
    let h = Harness::new(config);
    {
        let mut state = h.chain.state.lock();
        state.vault.insert((OWNER, Address::ZERO), units("1234567.891", 18));
        state.vault.insert((OWNER, USDC), U256::from(1u64));
    }

    let balances = h.session.vault_balances().await?;
    assert_eq!(balances[0].display, "1,234,567.89");
    // one base unit never renders as zero
    assert_eq!(balances[1].display, "0.000001");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn missing_vault_address() {
    let h = Harness::new(vault_config::VaultConfig::default());
    let err = h.session.deposit(Asset::Native, "1").await.unwrap_err();
    assert!(matches!(err, SessionError::MissingVault(NetworkId::Ethereum)));
    assert!(h.session.vault_balances().await.is_err());
}
