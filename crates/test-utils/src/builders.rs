#![allow(dead_code)]

use std::sync::Arc;

use ohscan::exec::{CredentialProvider, ElevationPolicy, SecretPrompt, Supervisor};

use crate::console::SharedBuffer;

/// Builder for a `Supervisor` wired to test doubles.
///
/// Defaults: no spinner, console captured in a `SharedBuffer`, and an
/// elevation policy that uses `env` as the token so "elevated" commands run
/// without root.
pub struct SupervisorBuilder {
    prompt: Arc<dyn SecretPrompt>,
    console: SharedBuffer,
    elevation: ElevationPolicy,
    progress: bool,
}

impl SupervisorBuilder {
    pub fn new(prompt: Arc<dyn SecretPrompt>) -> Self {
        Self {
            prompt,
            console: SharedBuffer::new(),
            elevation: test_elevation(),
            progress: false,
        }
    }

    pub fn console(mut self, console: SharedBuffer) -> Self {
        self.console = console;
        self
    }

    pub fn elevation(mut self, policy: ElevationPolicy) -> Self {
        self.elevation = policy;
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn build(self) -> Supervisor {
        Supervisor::new(Arc::new(CredentialProvider::new(self.prompt)))
            .with_elevation(self.elevation)
            .with_console(self.console.console())
            .with_progress(self.progress)
    }
}

/// `env` stands in for `sudo`: it exists everywhere on Unix and simply runs
/// the rest of the command, which can read the secret from stdin.
pub fn test_elevation() -> ElevationPolicy {
    ElevationPolicy {
        token: "env".to_string(),
        stdin_flag: None,
        supported: true,
    }
}
