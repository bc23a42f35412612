// src/pipeline/source.rs

//! Source tree bootstrap: `repo init/sync` inside Docker so the host stays
//! clean.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::errors::{OhscanError, Result};
use crate::exec::{CommandSpec, ExecOutcome, Supervisor};

/// Whether `branch` exists in the remote manifest repository.
pub async fn branch_exists(supervisor: &Supervisor, url: &str, branch: &str) -> Result<bool> {
    let spec = CommandSpec::new(["git", "ls-remote", "--heads", "--exit-code", url, branch])
        .description(format!("Checking branch {branch}"));

    match supervisor.execute(spec).await.into_finished()? {
        ExecOutcome::Completed { output, exit_code } => {
            Ok(exit_code == Some(0) && !output.trim().is_empty())
        }
        _ => Ok(false),
    }
}

/// Shell snippet run inside the container to check out the sources.
pub fn fetch_script(manifest_url: &str, branch: &str) -> String {
    format!(
        r#"
        set -e
        cd /home/openharmony
        if ! command -v repo >/dev/null 2>&1; then
            echo 'repo not found inside container, downloading...'
            wget -O ./repo https://gitee.com/oschina/repo/raw/fork_flow/repo-py3
            chmod +x ./repo
        fi
        ./repo init -u {manifest_url} -b {branch} --no-repo-verify
        ./repo sync -c --no-tags --optimized-fetch
        ./repo forall -c 'git lfs pull'
    "#
    )
}

pub fn has_checkout(oh_path: &Path) -> bool {
    oh_path.join(".repo").exists()
}

/// Check out the sources into `oh_path`, unless a checkout already exists.
pub async fn fetch_source(
    supervisor: &Supervisor,
    oh_path: &Path,
    manifest_url: &str,
    branch: &str,
    image: &str,
) -> Result<()> {
    if has_checkout(oh_path) {
        info!(path = %oh_path.display(), "existing source tree detected; skipping download");
        return Ok(());
    }

    fs::create_dir_all(oh_path)?;

    info!(branch, "checking that branch exists");
    if !branch_exists(supervisor, manifest_url, branch).await? {
        return Err(OhscanError::BranchNotFound(branch.to_string()));
    }

    info!(branch, "cloning OpenHarmony sources inside Docker; this may take a while");
    let mount = format!("{}:/home/openharmony", oh_path.display());
    let script = fetch_script(manifest_url, branch);
    let spec = CommandSpec::new([
        "sudo",
        "docker",
        "run",
        "--rm",
        "-v",
        mount.as_str(),
        image,
        "bash",
        "-c",
        script.as_str(),
    ])
    .description("Cloning OpenHarmony sources")
    .live_output(true);

    supervisor.execute(spec).await.into_success()?;
    info!("source checkout completed");
    Ok(())
}
