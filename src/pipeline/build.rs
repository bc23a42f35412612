// src/pipeline/build.rs

//! Product build inside Docker.
//!
//! The build container keeps running long after the GN description
//! (`out.json`) we need has been written, so the build is stopped early once
//! that file exists and has stopped changing.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use crate::errors::{OhscanError, Result};
use crate::exec::{CommandSpec, ExecOutcome, Supervisor};

pub fn out_json_path(oh_path: &Path, product: &str) -> PathBuf {
    oh_path.join("out").join(product).join("out.json")
}

/// Abort condition: `out.json` exists and two reads a settle delay apart
/// parse to the same JSON document.
#[derive(Debug, Clone)]
pub struct OutJsonStable {
    path: PathBuf,
    settle: Duration,
}

impl OutJsonStable {
    pub fn new(path: PathBuf, settle: Duration) -> Self {
        Self { path, settle }
    }

    /// Blocking check; meant to run on the abort monitor's blocking thread.
    ///
    /// A file that is missing, half written or unreadable is "not ready",
    /// never an error.
    pub fn check(&self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let first = match read_json(&self.path) {
            Ok(v) => v,
            Err(e) => {
                info!(path = %self.path.display(), error = %e, "out.json not ready yet");
                return Ok(false);
            }
        };

        thread::sleep(self.settle);

        match read_json(&self.path) {
            Ok(second) => Ok(first == second),
            Err(e) => {
                info!(path = %self.path.display(), error = %e, "out.json not ready yet");
                Ok(false)
            }
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Arguments of the `docker run` that builds `product`.
pub fn build_command(oh_path_abs: &Path, image: &str, container: &str, product: &str) -> Vec<String> {
    let script = format!(
        "./build/prebuilts_download.sh && ./build.sh --product-name {product} \
         --gn-flags=\"--ide=json\" --gn-flags=\"--json-file-name=out.json\""
    );
    vec![
        "sudo".to_string(),
        "docker".to_string(),
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        container.to_string(),
        "-v".to_string(),
        format!("{}:/home/openharmony", oh_path_abs.display()),
        image.to_string(),
        "sh".to_string(),
        "-c".to_string(),
        script,
    ]
}

pub struct BuildRequest<'a> {
    pub oh_path: &'a Path,
    pub oh_path_abs: &'a Path,
    pub image: &'a str,
    pub container: &'a str,
    pub product: &'a str,
    pub poll_interval: Duration,
    pub settle: Duration,
}

/// Run the build until it finishes or `out.json` is ready.
///
/// Both `Completed` and `Aborted` count as success here; whether the build
/// produced what we need is decided by [`check_out_json`].
pub async fn build_in_docker(supervisor: &Supervisor, req: &BuildRequest<'_>) -> Result<ExecOutcome> {
    let stable = OutJsonStable::new(out_json_path(req.oh_path, req.product), req.settle);
    let log_hint = req.oh_path.join("build.log");

    let spec = CommandSpec::new(build_command(req.oh_path_abs, req.image, req.container, req.product))
        .description(format!(
            "This may take a long time, you can check log from {}",
            log_hint.display()
        ))
        .abort_when(move || stable.check())
        .abort_poll_interval(req.poll_interval);

    let outcome = supervisor.execute(spec).await.into_finished()?;
    info!(outcome = outcome.kind(), "docker build finished");
    Ok(outcome)
}

/// Steps to finish the build by hand, shown when `out.json` is missing.
pub fn manual_instructions(oh_path_abs: &Path, image: &str, product: &str, venv: &Path) -> Vec<String> {
    let activate = if cfg!(windows) {
        venv.join("Scripts").join("activate")
    } else {
        venv.join("bin").join("activate")
    };
    vec![
        format!(
            "1. sudo docker run --rm -it -v {}:/home/openharmony {image}",
            oh_path_abs.display()
        ),
        format!(
            "2. ./build/prebuilts_download.sh && ./build.sh --product-name {product} \
             --gn-flags=\"--ide=json\" --gn-flags=\"--json-file-name=out.json\" --no-prebuild-sdk"
        ),
        "   after the build succeeds, run: exit".to_string(),
        format!("3. source {}", activate.display()),
        "4. rerun ohscan without --download".to_string(),
    ]
}

/// Locate `out.json` after the build, logging manual steps if it is missing.
pub fn check_out_json(oh_path: &Path, product: &str, instructions: &[String]) -> Result<PathBuf> {
    let path = out_json_path(oh_path, product);
    if path.exists() {
        info!(path = %path.display(), "build successful; found out.json");
        return Ok(path);
    }

    error!(path = %path.display(), "out.json not found; the build may have failed");
    error!("execute the following steps inside the Docker container manually:");
    for step in instructions {
        error!("  {step}");
    }
    error!("ensure that Docker is running and you have the necessary permissions");
    Err(OhscanError::BuildOutputMissing(path.display().to_string()))
}
