// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::ConfigFile;
use crate::exec::{CredentialProvider, Supervisor};
use crate::pipeline::Plan;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - plan resolution (image, paths, optional checkout)
/// - one credential provider and supervisor shared by every step
/// - the pipeline itself
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let plan = Plan::resolve(&args, &cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &plan);
        return Ok(());
    }

    let credentials = Arc::new(CredentialProvider::terminal());
    let supervisor = Supervisor::new(credentials).with_progress(!args.no_progress);

    info!(image = %plan.image, product = %plan.product, "starting licence audit");
    pipeline::run_pipeline(&supervisor, &cfg, &plan)
        .await
        .context("licence audit pipeline failed")?;
    info!(output = %plan.output.display(), "licence audit complete");
    Ok(())
}

/// Simple dry-run output: print the resolved plan.
fn print_dry_run(cfg: &ConfigFile, plan: &Plan) {
    println!("ohscan dry-run");
    println!("  image       = {}", plan.image);
    println!("  container   = {}", plan.container);
    println!("  oh_path     = {}", plan.oh_path_abs.display());
    println!("  product     = {}", plan.product);
    println!("  output      = {}", plan.output.display());
    println!("  result_dir  = {}", plan.result_dir.display());
    if let Some(ref branch) = plan.download {
        println!("  download    = {branch} (from {})", cfg.manifest.url);
    }
    if let Some(ref shadow) = plan.shadow {
        println!("  shadow      = {}", shadow.display());
    }
    println!();

    println!("tools:");
    println!("  venv        = {}", cfg.tools.venv_dir.display());
    println!("  scancode    = {}", cfg.tools.scancode_dir.display());
    println!("  liscopelens = {}", cfg.tools.liscopelens);
    println!("  threads     = {}", cfg.tools.scan_threads);
    println!();

    println!("build:");
    println!("  abort poll  = {:?}", cfg.build.abort_poll_interval());
    println!("  settle      = {:?}", cfg.build.settle_delay());

    debug!("dry-run complete (no execution)");
}
