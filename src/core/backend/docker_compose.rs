//! Container-compose backend (`dockerCompose`).
//!
//! The compose project is checked out on the host from `gitUrl` at
//! `commitId`, built during host preparation and brought up when the instance
//! starts. Data and artifacts are managed by the compose project itself, so
//! those categories contribute nothing.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{DeploymentBackend, NoFragments, StageScripts};
use crate::error::{Error, Result};
use crate::fragments;
use crate::instance::InstanceDefinition;
use crate::shell::{cd_and, quote_arg, quote_args};

pub struct DockerCompose {
    host_preparation: ComposeHostPreparation,
    start_instance: ComposeStartInstance,
}

impl DockerCompose {
    pub const TYPE: &'static str = "dockerCompose";

    pub fn new() -> Self {
        Self {
            host_preparation: ComposeHostPreparation,
            start_instance: ComposeStartInstance,
        }
    }
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self::new()
    }
}

impl DeploymentBackend for DockerCompose {
    fn backend_type(&self) -> &'static str {
        Self::TYPE
    }

    fn pre_host_preparation(&self) -> &dyn StageScripts {
        &NoFragments
    }

    fn host_preparation(&self) -> &dyn StageScripts {
        &self.host_preparation
    }

    fn start_instance(&self) -> &dyn StageScripts {
        &self.start_instance
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComposeValue {
    image: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    ports: BTreeMap<String, Value>,
    #[serde(default)]
    networks: Vec<String>,
    #[serde(default)]
    services: Vec<String>,
    #[serde(default)]
    git_url: Option<String>,
    #[serde(default)]
    commit_id: Option<String>,
    #[serde(default)]
    env_vars: BTreeMap<String, Value>,
}

/// Paths and settings derived from one instance definition.
struct ComposeProject<'a> {
    instance: &'a InstanceDefinition,
    value: ComposeValue,
}

impl<'a> ComposeProject<'a> {
    fn from_instance(instance: &'a InstanceDefinition) -> Result<Self> {
        let raw = &instance.deployment.value;
        let value: ComposeValue = serde_json::from_value(raw.clone()).map_err(|e| {
            Error::config_invalid_value("deployment.value", Some(raw.to_string()), e.to_string())
        })?;

        if value.image.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "deployment.value.image",
                None,
                "dockerCompose deployments need an image",
            ));
        }

        Ok(Self { instance, value })
    }

    /// `mekomsolutions/bahmni:1.0` -> `bahmni`
    fn project_slug(&self) -> &str {
        let last = self.value.image.rsplit('/').next().unwrap_or(&self.value.image);
        last.split(':').next().unwrap_or(last)
    }

    fn checkout_dir(&self) -> String {
        self.instance
            .host_subdir(&format!("{}_docker", self.project_slug()))
    }

    fn env_file_path(&self) -> String {
        self.instance
            .host_subdir(&format!("{}.env", self.instance.name))
    }

    fn compose(&self, subcommand: &str) -> String {
        let mut command = format!(
            "docker-compose -p {} {} {}",
            quote_arg(&self.instance.name),
            quote_arg(&format!("--env-file={}", self.env_file_path())),
            subcommand
        );
        if !self.value.services.is_empty() {
            command.push(' ');
            command.push_str(&quote_args(&self.value.services));
        }
        cd_and(&self.checkout_dir(), &command)
    }

    fn env_entries(&self) -> Vec<(String, String)> {
        let instance = self.instance;
        let mut entries = vec![
            ("INSTANCE_UUID".to_string(), instance.uuid.clone()),
            ("INSTANCE_NAME".to_string(), instance.name.clone()),
            ("INSTANCE_TYPE".to_string(), instance.instance_type.clone()),
            ("INSTANCE_GROUP".to_string(), instance.group.clone()),
            ("IMAGE".to_string(), self.value.image.clone()),
        ];
        if let Some(tag) = self.value.tag.as_deref().filter(|t| !t.is_empty()) {
            entries.push(("TAG".to_string(), tag.to_string()));
        }
        for (container, host) in &self.value.ports {
            entries.push((format!("PORT_{}", env_key_suffix(container)), scalar(host)));
        }
        if !self.value.networks.is_empty() {
            entries.push(("NETWORKS".to_string(), self.value.networks.join(",")));
        }
        for (key, value) in &self.value.env_vars {
            entries.push((key.clone(), scalar(value)));
        }
        entries
    }
}

fn env_key_suffix(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

struct ComposeHostPreparation;

impl StageScripts for ComposeHostPreparation {
    /// Checkout, env file, build, then root ownership of the instance tree.
    fn deployment_script(&self, instance: &InstanceDefinition) -> Result<String> {
        let project = ComposeProject::from_instance(instance)?;
        let ssh = instance.ssh();

        let git_url = project
            .value
            .git_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                Error::config_invalid_value(
                    "deployment.value.gitUrl",
                    None,
                    "dockerCompose host preparation needs the compose project's git URL",
                )
            })?;

        let checkout = fragments::git_checkout(
            git_url,
            &project.checkout_dir(),
            project.value.commit_id.as_deref(),
        );
        let env_file = fragments::env_file(&project.env_file_path(), &project.env_entries())?;
        let build = format!("{}\n", project.compose("build --pull"));
        let chown = format!("sudo chown -R root:root {}\n", quote_arg(&instance.host_dir()));

        Ok([checkout, env_file, build, chown]
            .iter()
            .map(|fragment| fragments::remote(ssh, fragment, true))
            .collect())
    }
}

struct ComposeStartInstance;

impl StageScripts for ComposeStartInstance {
    fn deployment_script(&self, instance: &InstanceDefinition) -> Result<String> {
        let project = ComposeProject::from_instance(instance)?;
        Ok(fragments::remote(
            instance.ssh(),
            &project.compose("up -d"),
            true,
        ))
    }
}
