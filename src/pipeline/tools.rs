// src/pipeline/tools.rs

//! Host-side tooling: the Python virtualenv, `liscopelens`, and scancode.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ToolsSection;
use crate::errors::{OhscanError, Result};
use crate::exec::{CommandSpec, ExecOutcome, Supervisor};

/// Directory holding the venv's executables.
pub fn venv_bin(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

pub async fn ensure_venv(supervisor: &Supervisor, tools: &ToolsSection) -> Result<()> {
    if tools.venv_dir.exists() {
        info!(path = %tools.venv_dir.display(), "virtual environment present");
        return Ok(());
    }

    info!(path = %tools.venv_dir.display(), "creating virtual environment");
    let venv = tools.venv_dir.display().to_string();
    let spec = CommandSpec::new([tools.python(), "-m", "venv", venv.as_str()])
        .description("Creating virtual environment");
    supervisor.execute(spec).await.into_success()?;
    info!(path = %venv, "virtual environment created");
    Ok(())
}

/// Make sure `tool` is runnable from the venv, installing it with pip when
/// its executable is missing.
pub async fn ensure_tool(supervisor: &Supervisor, venv: &Path, tool: &str) -> Result<()> {
    let bin = venv_bin(venv);
    let exe = bin.join(tool).display().to_string();

    let probe = CommandSpec::new([exe.as_str(), "--help"])
        .description(format!("Checking '{tool}' installation"));

    match supervisor.execute(probe).await {
        ExecOutcome::LaunchNotFound(_) => {
            info!(tool, "not found in virtual environment; installing via pip");
            let pip = bin.join("pip").display().to_string();
            let install = CommandSpec::new([pip.as_str(), "install", tool])
                .description(format!("Installing '{tool}'"));
            supervisor.execute(install).await.into_success()?;
            info!(tool, "installed successfully");
            Ok(())
        }
        other => {
            other.into_output()?;
            info!(tool, "already installed");
            Ok(())
        }
    }
}

pub fn scancode_executable(dir: &Path) -> PathBuf {
    if cfg!(windows) {
        dir.join("scancode.bat")
    } else {
        dir.join("scancode")
    }
}

/// Locate the scancode toolkit. Installing it is left to the operator.
pub fn ensure_scancode(dir: &Path) -> Result<PathBuf> {
    let exe = scancode_executable(dir);
    if exe.exists() {
        info!(path = %exe.display(), "scancode toolkit present");
        return Ok(exe);
    }
    Err(OhscanError::ConfigError(format!(
        "scancode not found at {}; download a scancode-toolkit release and extract it there \
         (or set [tools].scancode_dir)",
        exe.display()
    )))
}
