// src/exec/launcher.rs

//! Locating and spawning the external command.

use std::io::{self, PipeReader};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::credential::Elevated;
use super::outcome::ExecError;

/// A command whose executable has been resolved on `PATH`.
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub display: String,
}

/// Resolve the executable (and, for elevated commands, the program run under
/// elevation) before anything is prompted or spawned.
pub fn prepare(elevated: &Elevated) -> Result<PreparedCommand, ExecError> {
    let (first, rest) = elevated
        .args
        .split_first()
        .ok_or_else(|| ExecError::Worker("empty command".to_string()))?;

    let program = locate(first)?;

    if let Some(target) = elevated.target.and_then(|i| elevated.args.get(i)) {
        locate(target)?;
    }

    Ok(PreparedCommand {
        program,
        args: rest.to_vec(),
        display: elevated.args.join(" "),
    })
}

fn locate(program: &str) -> Result<PathBuf, ExecError> {
    which::which(program).map_err(|e| {
        debug!(program, error = %e, "executable lookup failed");
        ExecError::LaunchNotFound(program.to_string())
    })
}

/// A running child plus the read end of its merged stdout/stderr pipe.
pub struct Launched {
    pub child: Child,
    pub output: PipeReader,
}

/// Spawn the command with stdin piped and stdout + stderr sharing one pipe.
pub fn launch(cmd: &PreparedCommand) -> Result<Launched, ExecError> {
    let (reader, writer) = io::pipe().map_err(|e| fault("creating output pipe", e))?;
    let err_writer = writer
        .try_clone()
        .map_err(|e| fault("duplicating output pipe", e))?;

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::piped())
        .stdout(writer)
        .stderr(err_writer)
        .kill_on_drop(true);
    // Own process group, so terminate and kill also reach grandchildren.
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ExecError::LaunchNotFound(cmd.program.display().to_string())
        } else {
            fault(&format!("spawning `{}`", cmd.display), e)
        }
    })?;

    // The command still holds the write ends; the reader only sees EOF once
    // they are gone.
    drop(command);

    debug!(cmd = %cmd.display, pid = ?child.id(), "process spawned");
    Ok(Launched {
        child,
        output: reader,
    })
}

/// Ask the child's process group to exit (SIGTERM). A child that already
/// exited is left alone.
#[cfg(unix)]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::Signal;

    match signal_group(child, Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

/// No graceful signal outside Unix; fall back to killing the child.
#[cfg(not(unix))]
pub fn terminate(child: &mut Child) -> io::Result<()> {
    match child.try_wait()? {
        Some(_) => Ok(()),
        None => child.start_kill(),
    }
}

/// Kill the child's whole process group unconditionally and reap the child.
#[cfg(unix)]
pub async fn force_kill(child: &mut Child) {
    use nix::sys::signal::Signal;

    match signal_group(child, Signal::SIGKILL) {
        Ok(()) => {
            if let Err(e) = child.wait().await {
                warn!(pid = ?child.id(), error = %e, "failed to reap killed process");
            }
        }
        Err(e) => {
            debug!(error = %e, "process group kill failed; killing child only");
            kill_child(child).await;
        }
    }
}

#[cfg(not(unix))]
pub async fn force_kill(child: &mut Child) {
    kill_child(child).await;
}

async fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(pid = ?child.id(), error = %e, "failed to kill child process");
    }
}

/// The child leads its own group, so its pid is the group id.
#[cfg(unix)]
fn signal_group(child: &Child, sig: nix::sys::signal::Signal) -> nix::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    let pid = child.id().ok_or(Errno::ESRCH)?;
    signal::killpg(Pid::from_raw(pid as i32), sig)
}

fn fault(what: &str, err: io::Error) -> ExecError {
    ExecError::Worker(format!("{what}: {err}"))
}
