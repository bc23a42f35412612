// src/exec/mod.rs

//! Supervised external-process execution.
//!
//! Every external tool the pipeline runs goes through [`Supervisor::execute`].
//!
//! - [`spec`] defines the `CommandSpec` descriptor.
//! - [`credential`] holds the lazily-prompted secret and elevation handling.
//! - [`launcher`] resolves and spawns the child with merged output.
//! - [`collector`] reads output in live or buffered mode.
//! - [`timeout`] implements the buffered-mode deadline.
//! - [`abort`] runs the abort predicate monitor.
//! - [`progress`] draws the spinner on the caller's side.
//! - [`supervisor`] orchestrates one execution end to end.
//! - [`outcome`] defines `ExecOutcome` and `ExecError`.

pub mod abort;
pub mod collector;
pub mod credential;
pub mod launcher;
pub mod outcome;
pub mod progress;
pub mod spec;
pub mod supervisor;
pub mod timeout;

pub use credential::{CredentialProvider, ElevationPolicy, SecretPrompt, TerminalPrompt};
pub use outcome::{ExecError, ExecOutcome};
pub use progress::{Console, stdout_console};
pub use spec::{AbortPredicate, CommandSpec, DEFAULT_ABORT_POLL_INTERVAL};
pub use supervisor::Supervisor;
