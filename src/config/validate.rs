// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{OhscanError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::OhscanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_docker(cfg)?;
    validate_build(cfg)?;
    validate_tools(cfg)?;
    Ok(())
}

fn validate_docker(cfg: &RawConfigFile) -> Result<()> {
    if cfg.docker.registry.trim().is_empty() {
        return Err(OhscanError::ConfigError(
            "[docker].registry must not be empty".to_string(),
        ));
    }
    if cfg.docker.default_tag.trim().is_empty() {
        return Err(OhscanError::ConfigError(
            "[docker].default_tag must not be empty".to_string(),
        ));
    }
    for (key, image) in cfg.docker.specs.iter() {
        if image.trim().is_empty() {
            return Err(OhscanError::ConfigError(format!(
                "[docker.specs].{} maps to an empty image name",
                key
            )));
        }
    }
    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.abort_poll_secs == 0 {
        return Err(OhscanError::ConfigError(
            "[build].abort_poll_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    if cfg.tools.scan_threads == 0 {
        return Err(OhscanError::ConfigError(
            "[tools].scan_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.tools.liscopelens.trim().is_empty() {
        return Err(OhscanError::ConfigError(
            "[tools].liscopelens must not be empty".to_string(),
        ));
    }
    Ok(())
}
