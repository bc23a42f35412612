// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [docker]
/// registry = "swr.cn-south-1.myhuaweicloud.com/openharmony-docker/"
/// default_tag = "3.2"
///
/// [docker.specs]
/// standard = "docker_oh_standard"
///
/// [build]
/// abort_poll_secs = 20
///
/// [tools]
/// venv_dir = "venv"
/// scan_threads = 11
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub docker: DockerSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub manifest: ManifestSection,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub docker: DockerSection,
    pub build: BuildSection,
    pub tools: ToolsSection,
    pub manifest: ManifestSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            docker: raw.docker,
            build: raw.build,
            tools: raw.tools,
            manifest: raw.manifest,
        }
    }
}

/// `[docker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DockerSection {
    /// Registry prefix, including the trailing `/`.
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Tag used when `--tag` is not given.
    #[serde(default = "default_tag")]
    pub default_tag: String,

    /// Extra or overriding `system spec -> image name` entries.
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

fn default_registry() -> String {
    "swr.cn-south-1.myhuaweicloud.com/openharmony-docker/".to_string()
}

fn default_tag() -> String {
    "3.2".to_string()
}

impl Default for DockerSection {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            default_tag: default_tag(),
            specs: BTreeMap::new(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Seconds between checks for a finished `out.json` while the docker
    /// build runs.
    #[serde(default = "default_abort_poll_secs")]
    pub abort_poll_secs: u64,

    /// Delay between the two reads of `out.json` that decide whether it is
    /// stable.
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
}

fn default_abort_poll_secs() -> u64 {
    20
}

fn default_settle_millis() -> u64 {
    1000
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            abort_poll_secs: default_abort_poll_secs(),
            settle_millis: default_settle_millis(),
        }
    }
}

impl BuildSection {
    pub fn abort_poll_interval(&self) -> Duration {
        Duration::from_secs(self.abort_poll_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_venv_dir")]
    pub venv_dir: PathBuf,

    #[serde(default = "default_scancode_dir")]
    pub scancode_dir: PathBuf,

    /// Name of the licence-compatibility CLI installed into the venv.
    #[serde(default = "default_liscopelens")]
    pub liscopelens: String,

    /// `-n` passed to scancode.
    #[serde(default = "default_scan_threads")]
    pub scan_threads: usize,

    /// Interpreter used to create the venv; platform default when unset.
    #[serde(default)]
    pub python: Option<String>,
}

fn default_venv_dir() -> PathBuf {
    PathBuf::from("venv")
}

fn default_scancode_dir() -> PathBuf {
    PathBuf::from("scancode-toolkit")
}

fn default_liscopelens() -> String {
    "liscopelens".to_string()
}

fn default_scan_threads() -> usize {
    11
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            venv_dir: default_venv_dir(),
            scancode_dir: default_scancode_dir(),
            liscopelens: default_liscopelens(),
            scan_threads: default_scan_threads(),
            python: None,
        }
    }
}

impl ToolsSection {
    pub fn python(&self) -> &str {
        match &self.python {
            Some(p) => p,
            None if cfg!(windows) => "python",
            None => "python3",
        }
    }
}

/// `[manifest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSection {
    #[serde(default = "default_manifest_url")]
    pub url: String,
}

fn default_manifest_url() -> String {
    "https://gitee.com/openharmony/manifest".to_string()
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            url: default_manifest_url(),
        }
    }
}
