//! Stage drivers: compose one script per pipeline stage and persist it
//! together with the stage status.
//!
//! A stage run either writes both files (script and status) or neither.
//! Composition is a pure function of the [`StageContext`]; no process
//! environment is read here.

mod host_preparation;
mod pre_host_preparation;
mod start_instance;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::additional::AdditionalScriptsProvider;
use crate::backend::{BackendRegistry, DeploymentBackend};
use crate::error::{Error, Result};
use crate::instance::InstanceDefinition;
use crate::local_files::FileSystem;
use crate::proxy::ProxyRegistry;
use crate::script::Script;
use crate::store::InstanceStore;

pub use host_preparation::HostPreparation;
pub use pre_host_preparation::PreHostPreparation;
pub use start_instance::StartInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    PreHostPreparation,
    HostPreparation,
    StartInstance,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::PreHostPreparation,
        Stage::HostPreparation,
        Stage::StartInstance,
    ];

    /// Status code persisted after the stage composed successfully.
    pub fn code(&self) -> u8 {
        match self {
            Stage::PreHostPreparation => 1,
            Stage::HostPreparation => 2,
            Stage::StartInstance => 3,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Stage::PreHostPreparation => "pre-host-preparation",
            Stage::HostPreparation => "host-preparation",
            Stage::StartInstance => "start-instance",
        }
    }

    fn head_comment(&self) -> String {
        format!("# Autogenerated script for the CD {} stage...", self.slug())
    }

    pub fn driver(&self) -> &'static dyn StageDriver {
        match self {
            Stage::PreHostPreparation => &PreHostPreparation,
            Stage::HostPreparation => &HostPreparation,
            Stage::StartInstance => &StartInstance,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// What changed since the last pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFlags {
    pub artifacts: bool,
    pub deployment: bool,
    pub data: bool,
}

impl ChangeFlags {
    pub fn all() -> Self {
        Self {
            artifacts: true,
            deployment: true,
            data: true,
        }
    }
}

/// Everything a driver needs for one invocation.
pub struct StageContext<'a> {
    pub uuid: &'a str,
    pub flags: ChangeFlags,
    pub store: &'a dyn InstanceStore,
    pub backends: &'a BackendRegistry,
    pub proxies: &'a ProxyRegistry,
    pub additional_scripts: &'a dyn AdditionalScriptsProvider,
    /// Root of CI build artifacts; one subdirectory per instance UUID.
    pub artifacts_root: &'a Path,
}

impl StageContext<'_> {
    pub fn artifacts_dir(&self, uuid: &str) -> PathBuf {
        self.artifacts_root.join(uuid)
    }

    fn resolve_instance(&self, stage: Stage) -> Result<InstanceDefinition> {
        self.store
            .get_instance_definition(self.uuid)?
            .ok_or_else(|| Error::instance_not_found(self.uuid, stage.slug()))
    }

    fn resolve_backend(
        &self,
        instance: &InstanceDefinition,
        stage: Stage,
    ) -> Result<&dyn DeploymentBackend> {
        let backend_type = &instance.deployment.deployment_type;
        self.backends.resolve(backend_type).ok_or_else(|| {
            Error::backend_unknown(backend_type, &instance.uuid, stage.slug(), self.backends.types())
        })
    }

    /// Instance definition plus its backend, both resolved once per run.
    fn resolve(&self, stage: Stage) -> Result<(InstanceDefinition, &dyn DeploymentBackend)> {
        let instance = self.resolve_instance(stage)?;
        let backend = self.resolve_backend(&instance, stage)?;
        Ok((instance, backend))
    }
}

pub trait StageDriver: Sync {
    fn stage(&self) -> Stage;

    fn compose(&self, ctx: &StageContext<'_>) -> Result<Script>;
}

/// Where a stage run writes its files.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub build_dir: PathBuf,
    pub script_name: String,
    pub status_file_name: String,
}

impl StageOutput {
    pub fn script_path(&self) -> PathBuf {
        self.build_dir.join(&self.script_name)
    }

    pub fn status_path(&self) -> PathBuf {
        self.build_dir.join(&self.status_file_name)
    }
}

#[derive(Debug, Serialize)]
pub struct StatusRecord {
    pub status: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: Stage,
    pub uuid: String,
    pub status: u8,
    pub flags: ChangeFlags,
    pub fragments: usize,
    pub script_path: String,
    pub status_path: String,
}

const SCRIPT_MODE: u32 = 0o755;

/// Compose `stage` and persist its script and status.
pub fn run_stage(
    stage: Stage,
    ctx: &StageContext<'_>,
    output: &StageOutput,
    fs: &dyn FileSystem,
) -> Result<StageReport> {
    let script = stage.driver().compose(ctx)?;
    let fragments = script.body().len();
    let rendered = script.render();

    let status = serde_json::to_string(&StatusRecord {
        status: stage.code(),
    })
    .map_err(|e| Error::internal_json(e.to_string(), Some("serialize status".to_string())))?;

    fs.ensure_dir(&output.build_dir)?;

    let script_path = output.script_path();
    let status_path = output.status_path();

    let staged_script = fs.stage(&script_path, &rendered, Some(SCRIPT_MODE))?;
    let staged_status = match fs.stage(&status_path, &status, None) {
        Ok(staged) => staged,
        Err(err) => {
            fs.discard(staged_script);
            return Err(err);
        }
    };

    let previous_script = if fs.exists(&script_path) {
        match fs.read(&script_path) {
            Ok(content) => Some(content),
            Err(err) => {
                fs.discard(staged_script);
                fs.discard(staged_status);
                return Err(err);
            }
        }
    } else {
        None
    };

    if let Err(err) = fs.commit(staged_script) {
        fs.discard(staged_status);
        return Err(err);
    }
    if let Err(err) = fs.commit(staged_status) {
        restore_script(fs, &script_path, previous_script.as_deref());
        return Err(err);
    }

    log_status!(
        "stage",
        "{} composed for {} ({} fragments) -> {}",
        stage,
        ctx.uuid,
        fragments,
        script_path.display()
    );

    Ok(StageReport {
        stage,
        uuid: ctx.uuid.to_string(),
        status: stage.code(),
        flags: ctx.flags,
        fragments,
        script_path: script_path.display().to_string(),
        status_path: status_path.display().to_string(),
    })
}

/// Put back the script that preceded a half-finished run, or remove the new one.
fn restore_script(fs: &dyn FileSystem, script_path: &Path, previous: Option<&str>) {
    let restored = match previous {
        Some(content) => fs
            .stage(script_path, content, Some(SCRIPT_MODE))
            .and_then(|staged| fs.commit(staged)),
        None => fs.remove(script_path),
    };
    if let Err(err) = restored {
        log_status!("stage", "Could not restore {}: {}", script_path.display(), err.message);
    }
}
