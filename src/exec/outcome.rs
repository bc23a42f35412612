// src/exec/outcome.rs

//! Terminal outcomes of a supervised execution.

use std::time::Duration;

use thiserror::Error;

/// How a supervised command ended.
///
/// Every call to [`Supervisor::execute`](super::Supervisor::execute) yields
/// exactly one of these, after the worker has been joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The child exited on its own. The exit code is reported, not judged.
    Completed {
        output: String,
        exit_code: Option<i32>,
    },
    /// The buffered-mode deadline fired and the child was killed.
    /// Carries the configured timeout.
    TimedOut(Duration),
    /// The abort predicate fired and the child was asked to terminate.
    Aborted { output: String },
    /// The executable could not be located.
    LaunchNotFound(String),
    /// The secret could not be obtained from the operator.
    CredentialFailure(String),
    /// Anything else that went wrong while spawning, collecting or watching.
    WorkerFault(String),
}

impl ExecOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecOutcome::Completed { .. })
    }

    /// Captured text, for the variants that have any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecOutcome::Completed { output, .. } | ExecOutcome::Aborted { output } => {
                Some(output)
            }
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecOutcome::Completed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecOutcome::Completed { .. } => "completed",
            ExecOutcome::TimedOut(_) => "timed_out",
            ExecOutcome::Aborted { .. } => "aborted",
            ExecOutcome::LaunchNotFound(_) => "launch_not_found",
            ExecOutcome::CredentialFailure(_) => "credential_failure",
            ExecOutcome::WorkerFault(_) => "worker_fault",
        }
    }

    /// Collapse into the captured output, treating every non-completed
    /// outcome (including `Aborted`) as an error.
    pub fn into_output(self) -> Result<String, ExecError> {
        match self {
            ExecOutcome::Completed { output, .. } => Ok(output),
            ExecOutcome::TimedOut(limit) => Err(ExecError::Timeout(limit)),
            ExecOutcome::Aborted { .. } => Err(ExecError::Aborted),
            ExecOutcome::LaunchNotFound(program) => Err(ExecError::LaunchNotFound(program)),
            ExecOutcome::CredentialFailure(msg) => Err(ExecError::Credential(msg)),
            ExecOutcome::WorkerFault(msg) => Err(ExecError::Worker(msg)),
        }
    }

    /// Keep `Completed` and `Aborted` as-is; every other variant becomes its
    /// error. For callers that treat an abort as a normal way to stop.
    pub fn into_finished(self) -> Result<ExecOutcome, ExecError> {
        match self {
            finished @ (ExecOutcome::Completed { .. } | ExecOutcome::Aborted { .. }) => {
                Ok(finished)
            }
            other => other.into_output().map(|output| ExecOutcome::Completed {
                output,
                exit_code: None,
            }),
        }
    }

    /// Like [`into_output`](Self::into_output) but also rejects a non-zero
    /// exit code.
    pub fn into_success(self) -> Result<String, ExecError> {
        match self {
            ExecOutcome::Completed {
                output,
                exit_code: Some(0),
            } => Ok(output),
            ExecOutcome::Completed { exit_code, .. } => Err(ExecError::Failed(exit_code)),
            other => other.into_output(),
        }
    }
}

/// Error form of the failing [`ExecOutcome`] variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("executable not found: {0}")]
    LaunchNotFound(String),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command aborted by its abort condition")]
    Aborted,

    #[error("credential unavailable: {0}")]
    Credential(String),

    #[error("command failed with exit code {0:?}")]
    Failed(Option<i32>),

    #[error("worker fault: {0}")]
    Worker(String),
}

impl From<ExecError> for ExecOutcome {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::LaunchNotFound(program) => ExecOutcome::LaunchNotFound(program),
            ExecError::Timeout(limit) => ExecOutcome::TimedOut(limit),
            ExecError::Aborted => ExecOutcome::Aborted {
                output: String::new(),
            },
            ExecError::Credential(msg) => ExecOutcome::CredentialFailure(msg),
            ExecError::Failed(code) => ExecOutcome::Completed {
                output: String::new(),
                exit_code: code,
            },
            ExecError::Worker(msg) => ExecOutcome::WorkerFault(msg),
        }
    }
}
