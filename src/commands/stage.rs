use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use stagecraft::additional::{AdditionalScriptsProvider, DirScriptsProvider, NoAdditionalScripts};
use stagecraft::backend::BackendRegistry;
use stagecraft::local_files;
use stagecraft::proxy::ProxyRegistry;
use stagecraft::stage::{self, ChangeFlags, Stage, StageContext, StageOutput, StageReport};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct StageArgs {
    /// Pipeline stage to compose
    #[arg(value_enum)]
    stage: StageName,

    /// Instance to compose the stage for
    #[arg(long, env = "INSTANCE_UUID")]
    uuid: String,

    /// Build artifacts changed since the last run
    #[arg(
        long,
        env = "ARTIFACTS_CHANGES",
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_change_flag
    )]
    artifacts_changed: bool,

    /// Deployment configuration changed since the last run
    #[arg(
        long,
        env = "DEPLOYMENT_CHANGES",
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_change_flag
    )]
    deployment_changed: bool,

    /// Instance data changed since the last run
    #[arg(
        long,
        env = "DATA_CHANGES",
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_change_flag
    )]
    data_changed: bool,

    /// Output directory for the script and status file (overrides buildDir)
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Print the composed script instead of writing it
    #[arg(long)]
    dry_run: bool,
}

/// Only the literal `true` marks a change; CI exports anything else as unset.
fn parse_change_flag(value: &str) -> Result<bool, String> {
    Ok(value == "true")
}

#[derive(Clone, Copy, ValueEnum)]
enum StageName {
    Prehost,
    Host,
    Start,
}

impl From<StageName> for Stage {
    fn from(name: StageName) -> Self {
        match name {
            StageName::Prehost => Stage::PreHostPreparation,
            StageName::Host => Stage::HostPreparation,
            StageName::Start => Stage::StartInstance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutputJson {
    command: String,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<String>,
}

pub fn run(args: StageArgs, global: &GlobalArgs) -> CmdResult<StageOutputJson> {
    let config = global.load_config()?;
    let defaults = &config.defaults;
    let stage: Stage = args.stage.into();

    let store = global.store(&config)?;
    let backends = BackendRegistry::builtin();
    let proxies = ProxyRegistry::builtin();
    let additional_scripts: Box<dyn AdditionalScriptsProvider> =
        match defaults.additional_scripts_path()? {
            Some(root) => Box::new(DirScriptsProvider::new(root)),
            None => Box::new(NoAdditionalScripts),
        };
    let artifacts_root = defaults.artifacts_root()?;

    let ctx = StageContext {
        uuid: &args.uuid,
        flags: ChangeFlags {
            artifacts: args.artifacts_changed,
            deployment: args.deployment_changed,
            data: args.data_changed,
        },
        store: &store,
        backends: &backends,
        proxies: &proxies,
        additional_scripts: additional_scripts.as_ref(),
        artifacts_root: &artifacts_root,
    };

    if args.dry_run {
        let script = stage.driver().compose(&ctx)?;
        return Ok((
            StageOutputJson {
                command: format!("stage.{}", stage.slug()),
                dry_run: true,
                report: None,
                script: Some(script.render()),
            },
            0,
        ));
    }

    let output = StageOutput {
        build_dir: match args.build_dir {
            Some(dir) => dir,
            None => defaults.build_path()?,
        },
        script_name: defaults.script_names.for_stage(stage).to_string(),
        status_file_name: defaults.status_file_name.clone(),
    };

    let report = stage::run_stage(stage, &ctx, &output, &local_files::local())?;

    Ok((
        StageOutputJson {
            command: format!("stage.{}", stage.slug()),
            dry_run: false,
            report: Some(report),
            script: None,
        },
        0,
    ))
}
