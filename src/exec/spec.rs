// src/exec/spec.rs

//! Command descriptor handed to the [`Supervisor`](super::Supervisor).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between two evaluations of an abort predicate.
pub const DEFAULT_ABORT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Caller-supplied check polled by the abort monitor.
///
/// The predicate runs on a blocking thread, so it may do file I/O or sleep.
/// Returning `Ok(true)` requests graceful termination of the child; an `Err`
/// fails the whole execution.
pub type AbortPredicate = Arc<dyn Fn() -> anyhow::Result<bool> + Send + Sync>;

/// Everything the supervisor needs to run one external command.
///
/// Consumed by value when execution starts, so it cannot change underneath a
/// running command.
#[derive(Clone)]
pub struct CommandSpec {
    /// Program followed by its arguments.
    pub args: Vec<String>,

    /// Text shown next to the progress spinner.
    pub description: String,

    /// Overall deadline. Only enforced in buffered mode.
    pub timeout: Option<Duration>,

    /// Echo output line by line while the command runs.
    pub live_output: bool,

    pub abort_predicate: Option<AbortPredicate>,

    pub abort_poll_interval: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            description: String::new(),
            timeout: None,
            live_output: false,
            abort_predicate: None,
            abort_poll_interval: DEFAULT_ABORT_POLL_INTERVAL,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn live_output(mut self, live: bool) -> Self {
        self.live_output = live;
        self
    }

    /// Install an abort predicate.
    pub fn abort_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.abort_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn abort_poll_interval(mut self, interval: Duration) -> Self {
        self.abort_poll_interval = interval;
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("args", &self.args)
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .field("live_output", &self.live_output)
            .field("abort_predicate", &self.abort_predicate.as_ref().map(|_| "<fn>"))
            .field("abort_poll_interval", &self.abort_poll_interval)
            .finish()
    }
}
