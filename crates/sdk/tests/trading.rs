// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod common;

use alloy::primitives::U256;
use common::Harness;
use shade_evm_helpers::Wallet;
use shade_fhe::{FheType, Handle};
use shade_sdk::{
    scale::{format_fixed, parse_fixed, PRICE_DECIMALS, QUANTITY_DECIMALS},
    Execution, FailureKind, SdkError, TransactionStatus,
};
use shade_test_helpers::LedgerWrite;

fn status(execution: &Execution) -> TransactionStatus {
    match execution {
        Execution::Finished(state) => state.status,
        Execution::Skipped(status) => *status,
        Execution::Abandoned => panic!("execution abandoned"),
    }
}

#[tokio::test]
async fn test_open_decrypt_reveal_close() -> anyhow::Result<()> {
    let h = Harness::ready().await;
    h.ledger
        .set_mark_price(U256::from(parse_fixed("3120.25", PRICE_DECIMALS)?));
    let client = h.trading_client();
    let size = parse_fixed("1.5", QUANTITY_DECIMALS)?;

    let opened = client.open_position(true, size, 5).await;
    assert!(opened.is_success(), "{opened:?}");

    let writes = h.ledger.writes();
    let LedgerWrite::Open {
        is_long,
        size: size_handle,
        input_proof,
        leverage,
    } = &writes[0]
    else {
        panic!("expected an open, got {:?}", writes[0]);
    };
    assert_eq!(Handle::from(*is_long).fhe_type()?, FheType::Bool);
    assert_eq!(Handle::from(*size_handle).fhe_type()?, FheType::Uint64);
    assert!(!input_proof.is_empty());
    assert_eq!(*leverage, U256::from(5));

    let ids = client.positions_of(h.wallet.address()).await?;
    assert_eq!(ids, vec![U256::from(1)]);

    let view = client.decrypt_position(ids[0]).await?;
    assert!(view.is_long);
    assert_eq!(view.size, 150_000_000);
    assert_eq!(format_fixed(view.entry_price, PRICE_DECIMALS), "3120.25");
    assert!(!view.is_revealed);
    // decrypting is private: nothing was written
    assert_eq!(h.ledger.writes().len(), 1);

    assert!(client.reveal_position(ids[0]).await.is_success());
    assert!(client.close_position(ids[0]).await.is_success());
    let position = h.ledger.position(ids[0]).unwrap();
    assert!(position.isRevealed);
    assert!(!position.isOpen);
    Ok(())
}

#[tokio::test]
async fn test_actions_have_independent_lifecycles() -> anyhow::Result<()> {
    let h = Harness::ready().await;
    let client = h.trading_client();
    assert!(client.open_position(false, 10, 2).await.is_success());

    h.ledger.reject_writes(true);
    let closed = client.close_position(U256::from(1)).await;
    let failure = closed.state().and_then(|s| s.error.clone()).unwrap();
    assert_eq!(failure.kind, FailureKind::ChainWriteRejected);
    assert_eq!(failure.message, "Transaction rejected by user");

    assert_eq!(client.open_orchestrator().state().status, TransactionStatus::Success);
    assert_eq!(client.close_orchestrator().state().status, TransactionStatus::Failed);
    assert_eq!(client.reveal_orchestrator().state().status, TransactionStatus::Idle);

    // open is terminal until it is reset
    assert_eq!(
        status(&client.open_position(true, 1, 1).await),
        TransactionStatus::Success
    );
    assert!(matches!(
        client.open_position(true, 1, 1).await,
        Execution::Skipped(TransactionStatus::Success)
    ));
    client.open_orchestrator().reset();
    h.ledger.reject_writes(false);
    assert!(client.open_position(true, 1, 1).await.is_success());
    Ok(())
}

#[tokio::test]
async fn test_open_before_initialize_submits_nothing() {
    let h = Harness::new();
    let client = h.trading_client();

    let outcome = client.open_position(true, 1, 1).await;
    let state = outcome.state().cloned().unwrap();
    assert_eq!(state.status, TransactionStatus::Failed);
    assert_eq!(state.error.unwrap().kind, FailureKind::ContextNotReady);
    assert!(h.ledger.writes().is_empty());
}

#[tokio::test]
async fn test_declined_decryption_leaves_ledger_untouched() -> anyhow::Result<()> {
    let h = Harness::ready().await;
    let client = h.trading_client();
    assert!(client.open_position(true, 42, 3).await.is_success());

    h.wallet.reject_signatures(true);
    let err = client.decrypt_position(U256::from(1)).await.unwrap_err();
    assert_eq!(err, SdkError::AuthorizationRejected);
    assert_eq!(h.ledger.writes().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_reads() -> anyhow::Result<()> {
    let h = Harness::ready().await;
    let client = h.trading_client();
    h.ledger.set_mark_price(U256::from(7));
    h.ledger.set_paused(true);

    assert_eq!(client.mark_price().await?, U256::from(7));
    assert!(client.is_paused().await?);

    h.ledger.fail_reads(Some("connection refused"));
    assert!(matches!(client.mark_price().await, Err(SdkError::ChainRead(_))));
    assert!(matches!(
        client.decrypt_position(U256::from(1)).await,
        Err(SdkError::ChainRead(_))
    ));
    Ok(())
}
