use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ohscan::exec::SecretPrompt;

/// A prompt double that:
/// - counts how many times the operator was asked
/// - returns a fixed secret, or fails as if the input stream were closed.
#[derive(Debug)]
pub struct FakePrompt {
    secret: Option<String>,
    calls: AtomicUsize,
}

impl FakePrompt {
    pub fn returning(secret: &str) -> Arc<Self> {
        Arc::new(Self {
            secret: Some(secret.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            secret: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecretPrompt for FakePrompt {
    fn prompt(&self, _message: &str) -> io::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.secret {
            Some(s) => Ok(s.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input stream closed",
            )),
        }
    }
}
