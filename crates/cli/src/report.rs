// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{bail, Result};
use shade_sdk::{Execution, TransactionOrchestrator, TransactionState, TransactionStatus};
use std::{future::Future, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

fn line(label: &str, state: &TransactionState) -> String {
    match (&state.hash, &state.error) {
        (_, Some(error)) => format!("[{label}] {}: {}", state.status, error),
        (Some(hash), None) => format!("[{label}] {} {}", state.status, hash),
        (None, None) => format!("[{label}] {}", state.status),
    }
}

fn print_transitions(label: String, mut rx: watch::Receiver<TransactionState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            println!("{}", line(&label, &state));
            if state.status.is_terminal() {
                break;
            }
        }
    })
}

/// Run `action` while printing every state the orchestrator moves through.
pub async fn run_action<Fut>(orchestrator: &TransactionOrchestrator, action: Fut) -> Result<()>
where
    Fut: Future<Output = Execution>,
{
    let printer = print_transitions(orchestrator.label().to_string(), orchestrator.subscribe());
    let execution = action.await;

    match execution {
        Execution::Skipped(status) => {
            printer.abort();
            bail!("{} is already {}", orchestrator.label(), status)
        }
        Execution::Abandoned => {
            printer.abort();
            bail!("{} was reset before it finished", orchestrator.label())
        }
        Execution::Finished(state) => {
            // the terminal state is already published; let the printer catch up
            let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
            match (state.status, state.error) {
                (TransactionStatus::Success, _) => Ok(()),
                (_, Some(error)) if error.is_user_rejection() => {
                    println!("Cancelled: {}", error);
                    Ok(())
                }
                (_, Some(error)) => bail!("{} failed: {}", orchestrator.label(), error),
                (status, None) => bail!("{} ended in {}", orchestrator.label(), status),
            }
        }
    }
}
