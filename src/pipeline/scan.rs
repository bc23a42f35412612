// src/pipeline/scan.rs

//! Licence scanning of the directories referenced by the GN build graph,
//! followed by the `liscopelens` compatibility check.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{OhscanError, Result};
use crate::exec::{CommandSpec, Supervisor};

/// Label parts that are not path: the `//` root marker and `:target(...)`.
static LABEL_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"//|:.+$").expect("static regex")
});

/// How many leading components of a label make up a scan target.
const TARGET_DEPTH: usize = 3;

/// Keys of the `targets` object in the GN `out.json`.
pub fn read_gn_labels(gn_json: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(gn_json)?;
    let doc: Value = serde_json::from_str(&contents)?;
    let targets = doc
        .get("targets")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            OhscanError::ConfigError(format!("{} has no `targets` object", gn_json.display()))
        })?;
    Ok(targets.keys().cloned().collect())
}

/// `//foundation/arkui/ace_engine/frameworks:core` -> `foundation/arkui/ace_engine`.
pub fn label_to_path(label: &str) -> String {
    let stripped = LABEL_NOISE.replace_all(label, "");
    stripped
        .split('/')
        .take(TARGET_DEPTH)
        .collect::<Vec<_>>()
        .join("/")
}

/// Directories to scan, in first-seen order.
///
/// A label under an already collected directory is skipped; a label that
/// names a file contributes its parent directory; labels whose path does not
/// exist are ignored.
pub fn collect_targets<'a, I>(prefix: &Path, labels: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut targets: Vec<PathBuf> = Vec::new();

    for label in labels {
        let node = prefix.join(label_to_path(label));

        if targets.iter().any(|t| node.starts_with(t)) {
            continue;
        }

        if node.is_file() {
            if let Some(parent) = node.parent().filter(|p| p.exists()) {
                if !targets.iter().any(|t| t == parent) {
                    targets.push(parent.to_path_buf());
                }
            }
            continue;
        }

        if !node.exists() {
            continue;
        }

        targets.push(node);
    }

    targets
}

/// `path` relative to `prefix`, without a leading `./`.
pub fn normalize(path: &Path, prefix: &Path) -> PathBuf {
    let rel = path.strip_prefix(prefix).unwrap_or(path);
    rel.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `<last component of oh_path>-license`.
pub fn result_dir_for(oh_path: &Path) -> PathBuf {
    let name = oh_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .next_back()
        .unwrap_or_else(|| "oh".to_string());
    PathBuf::from(format!("{name}-license"))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct ScanRequest<'a> {
    pub scancode: &'a Path,
    pub prefix: &'a Path,
    pub result_dir: &'a Path,
    pub threads: usize,
}

/// Scan every target, reusing results already on disk. A failing target is
/// logged and counted; the remaining targets are still scanned.
pub async fn scan_all(
    supervisor: &Supervisor,
    req: &ScanRequest<'_>,
    targets: &[PathBuf],
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    let scancode = req.scancode.display().to_string();
    let threads = req.threads.to_string();

    for (idx, target) in targets.iter().enumerate() {
        let rel = normalize(target, req.prefix);
        let out = req.result_dir.join(format!("{}.json", rel.display()));
        info!(target = %target.display(), remaining = targets.len() - idx, "scanning target");

        if out.exists() {
            debug!(result = %out.display(), "already scanned; skipping");
            summary.skipped += 1;
            continue;
        }

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }

        let out_arg = out.display().to_string();
        let target_arg = target.display().to_string();
        let spec = CommandSpec::new([
            scancode.as_str(),
            "-n",
            threads.as_str(),
            "--ignore=.*",
            "--license",
            "--json",
            out_arg.as_str(),
            target_arg.as_str(),
        ])
        .description(format!("Scanning {}", rel.display()));

        match supervisor.execute(spec).await.into_success() {
            Ok(output) => {
                info!(result = %out.display(), "scan result written");
                debug!(output = %output.trim_end(), "scancode output");
                summary.scanned += 1;
            }
            Err(e) => {
                warn!(target = %target.display(), error = %e, "scan failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

pub struct LicenseCheck<'a> {
    pub executable: &'a Path,
    pub gn_json: &'a Path,
    pub scancode_dir: &'a Path,
    pub shadow: Option<&'a Path>,
    pub output: &'a Path,
}

pub fn liscopelens_args(check: &LicenseCheck<'_>) -> Vec<String> {
    let mut args = vec![
        check.executable.display().to_string(),
        "cpp".to_string(),
        "--gn_file".to_string(),
        check.gn_json.display().to_string(),
        "--scancode-dir".to_string(),
        check.scancode_dir.display().to_string(),
        "--ignore-unk".to_string(),
    ];
    if let Some(shadow) = check.shadow.filter(|p| p.exists()) {
        args.push("--shadow-license".to_string());
        args.push(shadow.display().to_string());
    }
    args.push("--output".to_string());
    args.push(check.output.display().to_string());
    args
}

pub async fn run_liscopelens(supervisor: &Supervisor, check: &LicenseCheck<'_>) -> Result<()> {
    let spec = CommandSpec::new(liscopelens_args(check))
        .description("Checking licence compatibility")
        .live_output(true);
    supervisor.execute(spec).await.into_success()?;
    info!(output = %check.output.display(), "licence report written");
    Ok(())
}
