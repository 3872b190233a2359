use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::stage::Stage;

/// Root configuration structure for stagecraft.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StagecraftConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via stagecraft.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default = "default_instances_dir")]
    pub instances_dir: String,

    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_scripts_dir: Option<String>,

    #[serde(default = "default_status_file_name")]
    pub status_file_name: String,

    #[serde(default)]
    pub script_names: ScriptNames,

    #[serde(default = "default_ssh_port")]
    pub default_ssh_port: u16,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            instances_dir: default_instances_dir(),
            build_dir: default_build_dir(),
            artifacts_dir: default_artifacts_dir(),
            additional_scripts_dir: None,
            status_file_name: default_status_file_name(),
            script_names: ScriptNames::default(),
            default_ssh_port: default_ssh_port(),
        }
    }
}

/// File names of the composed script for each stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNames {
    #[serde(default = "default_pre_host_preparation_script")]
    pub pre_host_preparation: String,

    #[serde(default = "default_host_preparation_script")]
    pub host_preparation: String,

    #[serde(default = "default_start_instance_script")]
    pub start_instance: String,
}

impl Default for ScriptNames {
    fn default() -> Self {
        Self {
            pre_host_preparation: default_pre_host_preparation_script(),
            host_preparation: default_host_preparation_script(),
            start_instance: default_start_instance_script(),
        }
    }
}

impl ScriptNames {
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::PreHostPreparation => &self.pre_host_preparation,
            Stage::HostPreparation => &self.host_preparation,
            Stage::StartInstance => &self.start_instance,
        }
    }
}

impl Defaults {
    pub fn instances_path(&self) -> Result<PathBuf> {
        paths::expand(&self.instances_dir)
    }

    pub fn build_path(&self) -> Result<PathBuf> {
        paths::expand(&self.build_dir)
    }

    /// Local root of CI build artifacts, one subdirectory per instance UUID.
    pub fn artifacts_root(&self) -> Result<PathBuf> {
        paths::expand(&self.artifacts_dir)
    }

    pub fn additional_scripts_path(&self) -> Result<Option<PathBuf>> {
        self.additional_scripts_dir
            .as_deref()
            .map(paths::expand)
            .transpose()
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_instances_dir() -> String {
    "~/.config/stagecraft/instances".to_string()
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_artifacts_dir() -> String {
    "~/.config/stagecraft/artifacts".to_string()
}

fn default_status_file_name() -> String {
    "status.json".to_string()
}

fn default_pre_host_preparation_script() -> String {
    "prehost-prepare.sh".to_string()
}

fn default_host_preparation_script() -> String {
    "host-prepare.sh".to_string()
}

fn default_start_instance_script() -> String {
    "start-instance.sh".to_string()
}

pub(crate) fn default_ssh_port() -> u16 {
    22
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load the effective configuration.
///
/// An explicit path must exist and parse. Without one, the global
/// stagecraft.json is used when present and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<StagecraftConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let path = paths::stagecraft_json()?;
    if !path.exists() {
        return Ok(StagecraftConfig::default());
    }
    read_config(&path)
}

fn read_config(path: &Path) -> Result<StagecraftConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}

/// Get the path to the global stagecraft.json (for display purposes)
pub fn config_path() -> Result<String> {
    Ok(paths::stagecraft_json()?.display().to_string())
}
