// src/exec/abort.rs

//! Abort monitor: polls a caller-supplied predicate while the command runs.
//!
//! The monitor never touches the child handle. It asks the worker to
//! terminate through a one-shot channel; the worker owns the child and
//! drops the receiver when it finishes, which also wakes the monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use super::spec::AbortPredicate;

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The command finished before the predicate fired.
    Finished,
    /// Termination was requested.
    Requested,
}

pub fn spawn_abort_monitor(
    predicate: AbortPredicate,
    interval: Duration,
    finished: Arc<AtomicBool>,
    terminate_tx: oneshot::Sender<()>,
) -> JoinHandle<Result<MonitorExit>> {
    tokio::spawn(watch(predicate, interval, finished, terminate_tx))
}

async fn watch(
    predicate: AbortPredicate,
    interval: Duration,
    finished: Arc<AtomicBool>,
    mut terminate_tx: oneshot::Sender<()>,
) -> Result<MonitorExit> {
    debug!(?interval, "abort monitor started");

    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = terminate_tx.closed() => {
                debug!("command finished; abort monitor exiting");
                return Ok(MonitorExit::Finished);
            }
        }

        if finished.load(Ordering::Acquire) {
            return Ok(MonitorExit::Finished);
        }

        let check = Arc::clone(&predicate);
        let verdict = match tokio::task::spawn_blocking(move || check()).await {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                // Stop the command rather than leave it running unwatched.
                let _ = terminate_tx.send(());
                return Err(e.context("abort predicate failed"));
            }
            Err(e) => {
                let _ = terminate_tx.send(());
                return Err(anyhow!("abort predicate panicked: {e}"));
            }
        };

        if !verdict {
            continue;
        }

        if finished.load(Ordering::Acquire) {
            return Ok(MonitorExit::Finished);
        }

        info!("abort condition met; terminating the command");
        return Ok(match terminate_tx.send(()) {
            Ok(()) => MonitorExit::Requested,
            // The worker dropped its receiver: the process already exited.
            Err(()) => MonitorExit::Finished,
        });
    }
}
