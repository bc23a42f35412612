// src/pipeline/docker.rs

//! Docker image resolution and container housekeeping.

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DockerSection;
use crate::errors::Result;
use crate::exec::{CommandSpec, Supervisor};

/// Stock system spec keys and the image each one maps to.
pub const BUILTIN_SPECS: [(&str, &str); 4] = [
    ("standard", "docker_oh_standard"),
    ("small", "docker_oh_small"),
    ("minimal", "docker_oh_mini"),
    ("hpm", "openharmony-docker"),
];

/// Image name for a system spec key. Config entries win over the built-in
/// table; unknown keys are taken as the image name itself.
pub fn image_name<'a>(key: &'a str, docker: &'a DockerSection) -> &'a str {
    if let Some(name) = docker.specs.get(key) {
        return name;
    }
    BUILTIN_SPECS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
        .unwrap_or(key)
}

/// Fully qualified `registry/name:tag` reference.
pub fn resolve_image(key: &str, tag: Option<&str>, docker: &DockerSection) -> String {
    let tag = tag.unwrap_or(&docker.default_tag);
    format!("{}{}:{}", docker.registry, image_name(key, docker), tag)
}

/// Unique name for the build container, so it can be killed later.
pub fn container_name() -> String {
    format!("oh-{}", Uuid::new_v4())
}

pub async fn pull_image(supervisor: &Supervisor, image: &str) -> Result<()> {
    info!(image, "pulling docker image");
    let spec = CommandSpec::new(["sudo", "docker", "pull", image])
        .description(format!("Pulling '{image}' image"));
    supervisor.execute(spec).await.into_success()?;
    info!(image, "docker image pulled");
    Ok(())
}

/// Stop the build container. Failure is not fatal: with `--rm` the container
/// is usually gone already.
pub async fn kill_container(supervisor: &Supervisor, name: &str) {
    let spec = CommandSpec::new(["sudo", "docker", "kill", name])
        .description(format!("Stopping container {name}"));
    let outcome = supervisor.execute(spec).await;
    if !matches!(outcome.exit_code(), Some(0)) {
        warn!(container = name, outcome = outcome.kind(), "docker kill did not succeed");
    }
}
