// src/pipeline/mod.rs

//! The licence audit pipeline.
//!
//! Sequential glue around the execution engine:
//! - [`docker`]: image resolution, pull, container kill
//! - [`source`]: optional source checkout inside Docker
//! - [`tools`]: virtualenv, `liscopelens`, scancode
//! - [`build`]: product build with early stop on a stable `out.json`
//! - [`scan`]: scancode per GN target and the final compatibility report

pub mod build;
pub mod docker;
pub mod scan;
pub mod source;
pub mod tools;

use std::path::{self, PathBuf};

use tracing::info;

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::errors::{OhscanError, Result};
use crate::exec::Supervisor;

/// Everything resolved from CLI + config before any command runs.
#[derive(Debug, Clone)]
pub struct Plan {
    pub image: String,
    pub container: String,
    pub oh_path: PathBuf,
    pub oh_path_abs: PathBuf,
    pub product: String,
    pub output: PathBuf,
    pub shadow: Option<PathBuf>,
    /// Branch to check out when `--download` was given.
    pub download: Option<String>,
    pub result_dir: PathBuf,
}

impl Plan {
    pub fn resolve(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        let download = match (args.download, &args.branch) {
            (true, Some(branch)) => Some(branch.clone()),
            (true, None) => {
                return Err(OhscanError::ConfigError(
                    "--branch is required when --download is specified".to_string(),
                ));
            }
            (false, _) => None,
        };

        Ok(Self {
            image: docker::resolve_image(&args.system_spec, args.tag.as_deref(), &cfg.docker),
            container: docker::container_name(),
            oh_path: args.oh_path.clone(),
            oh_path_abs: path::absolute(&args.oh_path)?,
            product: args.product_name.clone(),
            output: args.output.clone(),
            shadow: args.shadow.clone(),
            download,
            result_dir: scan::result_dir_for(&args.oh_path),
        })
    }
}

pub async fn run_pipeline(supervisor: &Supervisor, cfg: &ConfigFile, plan: &Plan) -> Result<()> {
    match &plan.download {
        Some(branch) => {
            docker::pull_image(supervisor, &plan.image).await?;
            source::fetch_source(
                supervisor,
                &plan.oh_path_abs,
                &cfg.manifest.url,
                branch,
                &plan.image,
            )
            .await?;
        }
        None if !plan.oh_path.exists() => {
            return Err(OhscanError::SourceMissing(format!(
                "{} (use --download to fetch automatically)",
                plan.oh_path.display()
            )));
        }
        None => {}
    }

    tools::ensure_venv(supervisor, &cfg.tools).await?;
    let scancode = tools::ensure_scancode(&cfg.tools.scancode_dir)?;
    tools::ensure_tool(supervisor, &cfg.tools.venv_dir, &cfg.tools.liscopelens).await?;

    if plan.download.is_none() {
        docker::pull_image(supervisor, &plan.image).await?;
    }

    info!(path = %plan.oh_path.display(), "------ Build OH in Docker ------");
    let request = build::BuildRequest {
        oh_path: &plan.oh_path,
        oh_path_abs: &plan.oh_path_abs,
        image: &plan.image,
        container: &plan.container,
        product: &plan.product,
        poll_interval: cfg.build.abort_poll_interval(),
        settle: cfg.build.settle_delay(),
    };
    build::build_in_docker(supervisor, &request).await?;

    let instructions = build::manual_instructions(
        &plan.oh_path_abs,
        &plan.image,
        &plan.product,
        &cfg.tools.venv_dir,
    );
    let gn_json = build::check_out_json(&plan.oh_path, &plan.product, &instructions)?;
    docker::kill_container(supervisor, &plan.container).await;

    info!("------ Running Scancode ------");
    let labels = scan::read_gn_labels(&gn_json)?;
    let targets = scan::collect_targets(&plan.oh_path, labels.iter().map(String::as_str));
    info!(targets = targets.len(), "collected scan targets");
    let scan_request = scan::ScanRequest {
        scancode: &scancode,
        prefix: &plan.oh_path,
        result_dir: &plan.result_dir,
        threads: cfg.tools.scan_threads,
    };
    let summary = scan::scan_all(supervisor, &scan_request, &targets).await?;
    info!(
        scanned = summary.scanned,
        skipped = summary.skipped,
        failed = summary.failed,
        "scan finished"
    );

    info!("------ Running liscopelens ------");
    let executable = tools::venv_bin(&cfg.tools.venv_dir).join(&cfg.tools.liscopelens);
    let check = scan::LicenseCheck {
        executable: &executable,
        gn_json: &gn_json,
        scancode_dir: &plan.result_dir,
        shadow: plan.shadow.as_deref(),
        output: &plan.output,
    };
    scan::run_liscopelens(supervisor, &check).await
}
