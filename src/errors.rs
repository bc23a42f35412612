// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OhscanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Branch not found in manifest repository: {0}")]
    BranchNotFound(String),

    #[error("Source tree not found: {0}")]
    SourceMissing(String),

    #[error("Build output not found: {0}")]
    BuildOutputMissing(String),

    #[error(transparent)]
    Exec(#[from] crate::exec::ExecError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OhscanError>;
