//! Externally supplied, stage-specific script fragments.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::instance::InstanceDefinition;
use crate::local_files::{self, FileSystem};
use crate::script::Script;
use crate::stage::Stage;

pub trait AdditionalScriptsProvider {
    /// Extra fragments for `instance` at `stage`, in the order they must run.
    fn scripts_for(&self, stage: Stage, instance: &InstanceDefinition) -> Result<Vec<String>>;
}

/// Provider that never adds anything.
pub struct NoAdditionalScripts;

impl AdditionalScriptsProvider for NoAdditionalScripts {
    fn scripts_for(&self, _stage: Stage, _instance: &InstanceDefinition) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Reads `*.sh` files laid out as `<root>/<stage>/<instance name>/` followed by
/// `<root>/<stage>/_all/`, each directory in file-name order.
pub struct DirScriptsProvider {
    root: PathBuf,
}

impl DirScriptsProvider {
    pub const ALL_INSTANCES: &'static str = "_all";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scripts_in(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!("{}/*.sh", glob::Pattern::escape(&dir.display().to_string()));
        let entries = glob::glob(&pattern).map_err(|e| {
            Error::internal_unexpected(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                Error::internal_io(e.to_string(), Some("list additional scripts".to_string()))
            })?;
            // Dangling links are kept so the read below reports them.
            if !path.is_dir() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl AdditionalScriptsProvider for DirScriptsProvider {
    fn scripts_for(&self, stage: Stage, instance: &InstanceDefinition) -> Result<Vec<String>> {
        let stage_dir = self.root.join(stage.slug());
        let fs = local_files::local();

        let mut fragments = Vec::new();
        for dir in [stage_dir.join(&instance.name), stage_dir.join(Self::ALL_INSTANCES)] {
            for path in Self::scripts_in(&dir)? {
                fragments.push(fs.read(&path)?);
            }
        }
        Ok(fragments)
    }
}

/// Append the provider's fragments after everything already in `script`.
pub fn compute_additional_scripts(
    mut script: Script,
    instance: &InstanceDefinition,
    stage: Stage,
    provider: &dyn AdditionalScriptsProvider,
) -> Result<Script> {
    let extra = provider.scripts_for(stage, instance)?;
    if !extra.is_empty() {
        log_status!(
            "stage",
            "Appending {} additional script(s) for '{}'",
            extra.len(),
            instance.name
        );
    }
    script.extend(extra);
    Ok(script)
}
