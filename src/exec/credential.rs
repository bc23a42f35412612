// src/exec/credential.rs

//! Credential provider and elevation-token handling.
//!
//! A single [`CredentialProvider`] is created per process and shared (via
//! `Arc`) with the supervisor. The operator is prompted at most once for the
//! lifetime of the provider; every later elevated command reuses the cached
//! secret.

use std::io;
use std::sync::Arc;

use dialoguer::Password;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::outcome::ExecError;

/// Non-echoing source of the elevation secret.
///
/// The blocking call runs on a Tokio blocking thread.
pub trait SecretPrompt: Send + Sync {
    fn prompt(&self, message: &str) -> io::Result<String>;
}

/// Prompt on the controlling terminal without echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt(&self, message: &str) -> io::Result<String> {
        Password::new()
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

pub struct CredentialProvider {
    prompt: Arc<dyn SecretPrompt>,
    message: String,
    secret: OnceCell<String>,
}

impl CredentialProvider {
    pub fn new(prompt: Arc<dyn SecretPrompt>) -> Self {
        Self {
            prompt,
            message: "Enter sudo password".to_string(),
            secret: OnceCell::new(),
        }
    }

    /// Provider backed by the real terminal.
    pub fn terminal() -> Self {
        Self::new(Arc::new(TerminalPrompt))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_cached(&self) -> bool {
        self.secret.initialized()
    }

    /// Return the cached secret, prompting the operator on first use.
    ///
    /// Concurrent callers wait for the single in-flight prompt. A failed
    /// prompt leaves the cache empty.
    pub async fn ensure_credential(&self) -> Result<String, ExecError> {
        let secret = self
            .secret
            .get_or_try_init(|| async {
                info!("elevated command requires a credential; prompting operator");
                let prompt = Arc::clone(&self.prompt);
                let message = self.message.clone();
                tokio::task::spawn_blocking(move || prompt.prompt(&message))
                    .await
                    .map_err(|e| ExecError::Credential(format!("prompt task failed: {e}")))?
                    .map_err(|e| ExecError::Credential(e.to_string()))
            })
            .await?;

        Ok(secret.clone())
    }
}

/// How an elevation token inside a command is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationPolicy {
    /// Argument that marks an elevated command (`sudo`).
    pub token: String,

    /// Flag inserted after the token so the secret is read from stdin.
    pub stdin_flag: Option<String>,

    /// Whether the platform understands the token at all. When false the
    /// token is stripped and the command runs unelevated.
    pub supported: bool,
}

impl Default for ElevationPolicy {
    fn default() -> Self {
        Self {
            token: "sudo".to_string(),
            stdin_flag: Some("-S".to_string()),
            supported: cfg!(any(target_os = "linux", target_os = "macos")),
        }
    }
}

/// Arguments after elevation handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elevated {
    pub args: Vec<String>,
    pub needs_credential: bool,
    /// Index of the program run under elevation, when it directly follows
    /// the token.
    pub target: Option<usize>,
}

impl ElevationPolicy {
    pub fn apply(&self, args: Vec<String>) -> Elevated {
        let Some(idx) = args.iter().position(|a| *a == self.token) else {
            return Elevated {
                args,
                needs_credential: false,
                target: None,
            };
        };

        if !self.supported {
            let args: Vec<String> = args.into_iter().filter(|a| *a != self.token).collect();
            info!(token = %self.token, "removed elevation token; not supported on this platform");
            return Elevated {
                args,
                needs_credential: false,
                target: None,
            };
        }

        let mut args = args;
        if let Some(flag) = &self.stdin_flag {
            if args.get(idx + 1) != Some(flag) {
                args.insert(idx + 1, flag.clone());
            }
        }

        // Only a program directly after the token (and its stdin flag) is
        // known to be the elevated one; options such as `-u root` or
        // `VAR=x` leave it unknown.
        let mut next = idx + 1;
        if self.stdin_flag.is_some() {
            next += 1;
        }
        let target = args
            .get(next)
            .filter(|a| !a.starts_with('-') && !a.contains('='))
            .map(|_| next);

        debug!(token = %self.token, ?target, "elevated command");
        Elevated {
            args,
            needs_credential: true,
            target,
        }
    }
}
