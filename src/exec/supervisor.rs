// src/exec/supervisor.rs

//! Execution supervisor: ties credential, launcher, collector, timeout,
//! abort monitor and progress reporter together for a single command.
//!
//! Lifecycle of one call:
//!
//! 1. elevation handled, executable located, credential resolved
//!    (nothing is shown on the console yet)
//! 2. child spawned; a worker task owns it and races exit against the
//!    deadline and a terminate request from the abort monitor
//! 3. the caller animates the spinner until the worker joins
//! 4. the monitor is joined and its failure, if any, folded into the outcome

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::abort::{MonitorExit, spawn_abort_monitor};
use super::collector::{CollectMode, spawn_collector};
use super::credential::{CredentialProvider, ElevationPolicy};
use super::launcher::{self, Launched};
use super::outcome::ExecOutcome;
use super::progress::{Console, ProgressReporter, stdout_console};
use super::spec::CommandSpec;
use super::timeout::{self, COLLECTOR_GRACE, Deadline};

pub struct Supervisor {
    credentials: Arc<CredentialProvider>,
    elevation: ElevationPolicy,
    console: Console,
    show_progress: bool,
}

impl Supervisor {
    pub fn new(credentials: Arc<CredentialProvider>) -> Self {
        Self {
            credentials,
            elevation: ElevationPolicy::default(),
            console: stdout_console(),
            show_progress: true,
        }
    }

    pub fn with_elevation(mut self, policy: ElevationPolicy) -> Self {
        self.elevation = policy;
        self
    }

    /// Where live output and the spinner are written.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialProvider> {
        &self.credentials
    }

    /// Run one command to a terminal outcome.
    ///
    /// Returns only after the worker has joined, so the outcome (and any
    /// captured output) is complete.
    pub async fn execute(&self, spec: CommandSpec) -> ExecOutcome {
        let CommandSpec {
            args,
            description,
            timeout,
            live_output,
            abort_predicate,
            abort_poll_interval,
        } = spec;

        let elevated = self.elevation.apply(args);
        let prepared = match launcher::prepare(&elevated) {
            Ok(p) => p,
            Err(e) => return report(&elevated.args.join(" "), e.into()),
        };

        let secret = if elevated.needs_credential {
            match self.credentials.ensure_credential().await {
                Ok(s) => Some(s),
                Err(e) => return report(&prepared.display, e.into()),
            }
        } else {
            None
        };

        if live_output && timeout.is_some() {
            debug!(cmd = %prepared.display, "timeout ignored in live mode");
        }

        let Launched { child, output } = match launcher::launch(&prepared) {
            Ok(l) => l,
            Err(e) => return report(&prepared.display, e.into()),
        };
        info!(cmd = %prepared.display, live = live_output, "command started");

        let finished = Arc::new(AtomicBool::new(false));
        let (terminate_tx, terminate_rx) = oneshot::channel();
        let monitor = abort_predicate.map(|predicate| {
            spawn_abort_monitor(
                predicate,
                abort_poll_interval,
                Arc::clone(&finished),
                terminate_tx,
            )
        });

        let worker = Worker {
            child,
            output,
            secret,
            echo: live_output.then(|| (self.console)()),
            deadline: if live_output { None } else { timeout },
            terminate_rx,
            cmd: prepared.display.clone(),
        };
        let handle = tokio::spawn(worker.run(finished));

        let reporter = if self.show_progress {
            ProgressReporter::new(description, (self.console)())
        } else {
            ProgressReporter::disabled()
        };

        let outcome = match reporter.run_until(handle).await {
            Ok(outcome) => outcome,
            Err(e) => ExecOutcome::WorkerFault(format!("worker task failed: {e}")),
        };

        let outcome = match monitor {
            Some(handle) => fold_monitor(outcome, handle).await,
            None => outcome,
        };

        report(&prepared.display, outcome)
    }
}

/// Owns the child for the duration of one execution.
struct Worker {
    child: Child,
    output: std::io::PipeReader,
    secret: Option<String>,
    echo: Option<Box<dyn Write + Send>>,
    deadline: Option<std::time::Duration>,
    terminate_rx: oneshot::Receiver<()>,
    cmd: String,
}

impl Worker {
    async fn run(self, finished: Arc<AtomicBool>) -> ExecOutcome {
        let outcome = self.drive().await;
        finished.store(true, Ordering::Release);
        outcome
    }

    async fn drive(self) -> ExecOutcome {
        let Worker {
            mut child,
            output,
            secret,
            echo,
            deadline,
            mut terminate_rx,
            cmd,
        } = self;

        let mode = match echo {
            Some(console) => CollectMode::Live(console),
            None => CollectMode::Buffered,
        };
        let collected = match spawn_collector(output, mode) {
            Ok(rx) => rx,
            Err(e) => {
                launcher::force_kill(&mut child).await;
                return ExecOutcome::WorkerFault(format!("starting output collector: {e}"));
            }
        };

        feed_stdin(&mut child, secret.as_deref()).await;

        let deadline = deadline.map(Deadline::starting_now);
        let mut watching = true;
        let mut aborted = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,

                limit = timeout::expired(deadline) => {
                    warn!(cmd = %cmd, ?limit, "command timed out; killing process");
                    launcher::force_kill(&mut child).await;
                    // Partial output is discarded; only make sure the
                    // collector is not left reading forever.
                    let _ = tokio::time::timeout(COLLECTOR_GRACE, collected).await;
                    return ExecOutcome::TimedOut(limit);
                }

                request = &mut terminate_rx, if watching => {
                    watching = false;
                    if request.is_ok() {
                        aborted = true;
                        if let Err(e) = launcher::terminate(&mut child) {
                            warn!(cmd = %cmd, error = %e, "failed to terminate process");
                        }
                    }
                }
            }
        };

        let status = match status {
            Ok(s) => s,
            Err(e) => return ExecOutcome::WorkerFault(format!("waiting for `{cmd}`: {e}")),
        };

        if aborted {
            let output = match tokio::time::timeout(COLLECTOR_GRACE, collected).await {
                Ok(Ok(Ok(text))) => text,
                _ => String::new(),
            };
            return ExecOutcome::Aborted { output };
        }

        match collected.await {
            Ok(Ok(output)) => ExecOutcome::Completed {
                output,
                exit_code: status.code(),
            },
            Ok(Err(e)) => ExecOutcome::WorkerFault(format!("reading output of `{cmd}`: {e}")),
            Err(_) => ExecOutcome::WorkerFault("output collector exited without a result".into()),
        }
    }
}

/// Deliver the secret (if any) and close stdin.
async fn feed_stdin(child: &mut Child, secret: Option<&str>) {
    let Some(mut stdin) = child.stdin.take() else {
        return;
    };
    if let Some(secret) = secret {
        let payload = format!("{secret}\n");
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            debug!(error = %e, "child closed stdin before the credential was written");
        }
    }
}

async fn fold_monitor(
    outcome: ExecOutcome,
    monitor: JoinHandle<anyhow::Result<MonitorExit>>,
) -> ExecOutcome {
    let failure = match monitor.await {
        Ok(Ok(exit)) => {
            debug!(?exit, "abort monitor joined");
            return outcome;
        }
        Ok(Err(e)) => format!("{e:#}"),
        Err(e) => format!("abort monitor failed: {e}"),
    };

    match outcome {
        ExecOutcome::Completed { .. } | ExecOutcome::Aborted { .. } => {
            ExecOutcome::WorkerFault(failure)
        }
        // Keep the first failure.
        other => other,
    }
}

fn report(cmd: &str, outcome: ExecOutcome) -> ExecOutcome {
    match &outcome {
        ExecOutcome::Completed { exit_code, .. } => {
            info!(cmd, exit_code = ?exit_code, "command finished");
        }
        ExecOutcome::Aborted { .. } => info!(cmd, "command aborted"),
        ExecOutcome::TimedOut(limit) => warn!(cmd, ?limit, "command timed out"),
        other => warn!(cmd, outcome = other.kind(), ?other, "command failed"),
    }
    outcome
}
