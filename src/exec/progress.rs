// src/exec/progress.rs

//! Spinner shown on the caller's side while a command runs.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

pub const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);
const CLEAR_WIDTH: usize = 80;

/// Factory for the caller's console (stdout in production).
pub type Console = Arc<dyn Fn() -> Box<dyn Write + Send> + Send + Sync>;

pub fn stdout_console() -> Console {
    Arc::new(|| Box::new(io::stdout()))
}

pub struct ProgressReporter {
    description: String,
    out: Option<Box<dyn Write + Send>>,
}

impl ProgressReporter {
    pub fn new(description: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            description: description.into(),
            out: Some(out),
        }
    }

    pub fn disabled() -> Self {
        Self {
            description: String::new(),
            out: None,
        }
    }

    /// Animate until `work` completes, clear the line, and hand back its
    /// output.
    ///
    /// A failing console stops the animation but never the work.
    pub async fn run_until<F: Future>(mut self, work: F) -> F::Output {
        let Some(mut out) = self.out.take() else {
            return work.await;
        };
        tokio::pin!(work);

        let mut frames = FRAMES.iter().cycle();
        let mut ticker = interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut drawing = true;

        let output = loop {
            tokio::select! {
                output = &mut work => break output,
                _ = ticker.tick(), if drawing => {
                    if let Some(frame) = frames.next() {
                        drawing = write!(out, "\r{} ... {} ", self.description, frame)
                            .and_then(|_| out.flush())
                            .is_ok();
                    }
                }
            }
        };

        let _ = write!(out, "\r{}\r", " ".repeat(CLEAR_WIDTH)).and_then(|_| out.flush());
        output
    }
}
