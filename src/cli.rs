// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ohscan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ohscan",
    version,
    about = "OpenHarmony licence audit pipeline: build in Docker, scan, check compatibility.",
    long_about = None
)]
pub struct CliArgs {
    /// Check out / update sources inside Docker before the build.
    #[arg(long, requires = "branch")]
    pub download: bool,

    /// OpenHarmony release branch or tag (required with --download).
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Docker system spec key (standard, small, minimal, hpm) or an image name.
    #[arg(long, value_name = "KEY|IMAGE", default_value = "standard")]
    pub system_spec: String,

    /// Docker image tag. Defaults to `[docker].default_tag`.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Path to the OpenHarmony sources on the host.
    #[arg(long, value_name = "PATH", default_value = "./oh-source")]
    pub oh_path: PathBuf,

    /// Product to build inside Docker.
    #[arg(long, value_name = "NAME", default_value = "rk3568")]
    pub product_name: String,

    /// Output directory for the licence report.
    #[arg(long, value_name = "PATH", default_value = "./output")]
    pub output: PathBuf,

    /// Node-to-licence JSON file for shadow mode.
    #[arg(long, value_name = "FILE")]
    pub shadow: Option<PathBuf>,

    /// Path to the config file (TOML). Missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Ohscan.toml")]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OHSCAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the pipeline plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    pub no_progress: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
