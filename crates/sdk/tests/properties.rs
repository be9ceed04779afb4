// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod common;

use alloy::primitives::Address;
use common::Harness;
use proptest::prelude::*;
use shade_evm_helpers::TxReceipt;
use shade_fhe::PlaintextValue;
use shade_sdk::{
    is_rejection_message, ContextState, FailureKind, SdkError, TransactionStateMachine,
    TransactionStatus, TxFailure,
};
use shade_test_helpers::{trading_contract, tx_hash};
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
}

fn arb_value() -> impl Strategy<Value = PlaintextValue> {
    prop_oneof![
        any::<bool>().prop_map(PlaintextValue::from),
        any::<u64>().prop_map(PlaintextValue::from),
    ]
}

/// Walk a fresh machine `steps` transitions down one path to a terminal state.
fn advance(machine: &TransactionStateMachine, steps: usize, fail: bool) {
    let hash = tx_hash(1);
    if steps == 0 {
        return;
    }
    let run = machine.begin().expect("idle machine begins");
    for step in 1..steps {
        let moved = match step {
            1 => machine.submitted(run, hash),
            2 => machine.confirming(run),
            _ if fail => machine.failed(run, TxFailure::new(FailureKind::ChainWriteFailed, "reverted")),
            _ => machine.succeeded(
                run,
                TxReceipt {
                    transaction_hash: hash,
                    block_number: Some(1),
                    gas_used: 21_000,
                    success: true,
                },
            ),
        };
        assert!(moved, "step {step} refused");
    }
}

proptest! {
    #[test]
    fn handles_follow_append_order(values in prop::collection::vec(arb_value(), 1..12)) {
        let rt = runtime();
        let (handles, stored) = rt.block_on(async {
            let h = Harness::ready().await;
            let mut session = h
                .context
                .create_encrypted_input_session(trading_contract(), Address::ZERO)
                .unwrap();
            for value in &values {
                session.add(value.clone());
            }
            let input = session.encrypt().await.unwrap();
            let stored: Vec<_> = input.handles.iter().map(|x| h.backend.stored(x)).collect();
            (input.handles, stored)
        });

        prop_assert_eq!(handles.len(), values.len());
        for (i, (handle, value)) in handles.iter().zip(&values).enumerate() {
            prop_assert_eq!(handle.index() as usize, i);
            prop_assert_eq!(handle.fhe_type().unwrap(), value.fhe_type());
            prop_assert_eq!(stored[i], Some(value.as_u256()));
        }
    }

    #[test]
    fn sessions_refused_unless_ready(fail_init in any::<bool>(), values in prop::collection::vec(arb_value(), 1..6)) {
        let rt = runtime();
        let h = Harness::new();
        let expected = if fail_init {
            h.backend.fail_initialize(Some("keys unavailable"));
            prop_assert!(rt.block_on(h.context.initialize()).is_err());
            ContextState::Failed
        } else {
            ContextState::Uninitialized
        };

        let refused = h
            .context
            .create_encrypted_input_session(trading_contract(), Address::ZERO)
            .map(|mut session| {
                for value in &values {
                    session.add(value.clone());
                }
                session.len()
            });
        prop_assert_eq!(refused, Err(SdkError::ContextNotReady(expected)));
        prop_assert!(matches!(
            h.context.create_decryption_session(),
            Err(SdkError::ContextNotReady(_))
        ));
    }

    #[test]
    fn reset_returns_to_idle_from_any_state(steps in 0usize..5, fail in any::<bool>()) {
        let machine = TransactionStateMachine::new("prop");
        advance(&machine, steps, fail);
        machine.reset();
        let state = machine.state();
        prop_assert_eq!(state.status, TransactionStatus::Idle);
        prop_assert!(state.hash.is_none());
        prop_assert!(state.error.is_none());
        prop_assert!(state.receipt.is_none());
    }

    #[test]
    fn only_idle_machines_begin(steps in 1usize..5, fail in any::<bool>()) {
        let machine = TransactionStateMachine::new("prop");
        advance(&machine, steps, fail);
        let before = machine.state();
        prop_assert!(machine.begin().is_none());
        prop_assert_eq!(machine.state(), before);
    }

    #[test]
    fn rejection_signal_anywhere_in_message(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
        let message = format!("{prefix}User rejected the request{suffix}");
        prop_assert!(is_rejection_message(&message));
        let err = SdkError::chain_write(&eyre::eyre!(message));
        prop_assert!(err.is_user_rejection());
    }
}
