// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod common;

use alloy::primitives::Address;
use common::Harness;
use shade_sdk::{ContextState, SdkError};
use shade_test_helpers::{add_tracing, MockBackend, MockWallet, TEST_CHAIN_ID};
use std::time::Duration;

#[tokio::test]
async fn test_sessions_require_ready_context() {
    let h = Harness::new();
    assert_eq!(h.context.state(), ContextState::Uninitialized);

    let err = h
        .context
        .create_encrypted_input_session(Address::ZERO, Address::ZERO)
        .err();
    assert_eq!(err, Some(SdkError::ContextNotReady(ContextState::Uninitialized)));
    assert!(matches!(
        h.context.create_decryption_session(),
        Err(SdkError::ContextNotReady(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_session_rejected_while_initializing() -> anyhow::Result<()> {
    let h = Harness::with(
        MockBackend::new().with_init_delay(Duration::from_secs(2)),
        MockWallet::new(TEST_CHAIN_ID),
    );
    let mut states = h.context.subscribe();

    let context = h.context.clone();
    let init = tokio::spawn(async move { context.initialize().await });
    states
        .wait_for(|s| *s == ContextState::Initializing)
        .await?;

    assert!(matches!(
        h.context
            .create_encrypted_input_session(Address::ZERO, Address::ZERO),
        Err(SdkError::ContextNotReady(ContextState::Initializing))
    ));

    init.await??;
    assert!(h.context.is_ready());
    assert!(h
        .context
        .create_encrypted_input_session(Address::ZERO, Address::ZERO)
        .is_ok());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_initialize_runs_once() -> anyhow::Result<()> {
    let _guard = add_tracing();
    let h = Harness::with(
        MockBackend::new().with_init_delay(Duration::from_millis(300)),
        MockWallet::new(TEST_CHAIN_ID),
    );

    let (a, b, c) = tokio::join!(
        h.context.initialize(),
        h.context.initialize(),
        h.context.initialize()
    );
    a?;
    b?;
    c?;

    assert_eq!(h.backend.init_calls(), 1);
    assert!(h.context.is_ready());
    assert!(h.wallet.switch_calls().is_empty());

    // already Ready: nothing runs again
    h.context.initialize().await?;
    assert_eq!(h.backend.init_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_chain_is_added_then_selected() -> anyhow::Result<()> {
    let h = Harness::with(MockBackend::new(), MockWallet::new(1));
    h.context.initialize().await?;

    assert_eq!(h.wallet.current_chain(), TEST_CHAIN_ID);
    assert_eq!(h.wallet.switch_calls(), vec![TEST_CHAIN_ID, TEST_CHAIN_ID]);
    let added = h.wallet.added_chains();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].chain_id, TEST_CHAIN_ID);
    assert_eq!(added[0].rpc_urls, vec![h.context.network().rpc_url.clone()]);
    Ok(())
}

#[tokio::test]
async fn test_known_chain_is_switched_without_adding() -> anyhow::Result<()> {
    let h = Harness::with(MockBackend::new(), MockWallet::new(1).knowing(TEST_CHAIN_ID));
    h.context.initialize().await?;

    assert_eq!(h.wallet.switch_calls(), vec![TEST_CHAIN_ID]);
    assert!(h.wallet.added_chains().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failure_is_sticky_until_reset() -> anyhow::Result<()> {
    let h = Harness::new();
    h.backend.fail_initialize(Some("network keys unavailable"));

    match h.context.initialize().await {
        Err(SdkError::InitializationFailed(reason)) => {
            assert!(reason.contains("network keys unavailable"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(h.context.has_failed());
    assert!(h.context.wait_until_ready().await.is_err());

    // Failed is terminal for initialize()
    h.context.initialize().await?;
    assert_eq!(h.backend.init_calls(), 1);
    assert!(h.context.has_failed());

    h.backend.fail_initialize(None);
    assert!(h.context.reset_failure());
    assert_eq!(h.context.state(), ContextState::Uninitialized);
    assert!(!h.context.reset_failure());

    h.context.initialize().await?;
    assert_eq!(h.backend.init_calls(), 2);
    h.context.wait_until_ready().await?;
    Ok(())
}

#[tokio::test]
async fn test_reset_failure_ignored_when_ready() -> anyhow::Result<()> {
    let h = Harness::ready().await;
    assert!(!h.context.reset_failure());
    assert!(h.context.is_ready());
    Ok(())
}
