// src/exec/timeout.rs

//! Deadline handling for buffered-mode commands.

use std::future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// How long to wait for the collector to drain after the child was killed or
/// terminated before its output is given up on.
pub const COLLECTOR_GRACE: Duration = Duration::from_secs(2);

/// A configured timeout anchored at the moment the child started.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    limit: Duration,
    at: Instant,
}

impl Deadline {
    pub fn starting_now(limit: Duration) -> Self {
        Self {
            limit,
            at: Instant::now() + limit,
        }
    }
}

/// Resolve with the configured limit once the deadline passes. Without a
/// deadline this never resolves.
pub async fn expired(deadline: Option<Deadline>) -> Duration {
    match deadline {
        Some(d) => {
            sleep_until(d.at).await;
            d.limit
        }
        None => future::pending().await,
    }
}
