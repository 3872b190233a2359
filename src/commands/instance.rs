use clap::{Args, Subcommand};
use serde::Serialize;

use stagecraft::instance::InstanceDefinition;
use stagecraft::store::{self, InstanceStore};
use stagecraft::{log_status, Error};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct InstanceArgs {
    #[command(subcommand)]
    command: InstanceCommand,
}

#[derive(Subcommand)]
enum InstanceCommand {
    /// List instances in the store
    List,
    /// Show one instance definition
    Show {
        /// Instance UUID
        uuid: String,
    },
    /// Validate every definition and name uniqueness among active instances
    Validate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    uuid: String,
    name: String,
    #[serde(rename = "type")]
    instance_type: String,
    group: String,
    active: bool,
    deployment_type: String,
    host: String,
}

impl From<&InstanceDefinition> for InstanceSummary {
    fn from(def: &InstanceDefinition) -> Self {
        Self {
            uuid: def.uuid.clone(),
            name: def.name.clone(),
            instance_type: def.instance_type.clone(),
            group: def.group.clone(),
            active: def.active,
            deployment_type: def.deployment.deployment_type.clone(),
            host: def.ssh().destination(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instances: Option<Vec<InstanceSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<InstanceDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validated: Option<usize>,
}

pub fn run(args: InstanceArgs, global: &GlobalArgs) -> CmdResult<InstanceOutput> {
    let config = global.load_config()?;
    let store = global.store(&config)?;

    match args.command {
        InstanceCommand::List => list(&store),
        InstanceCommand::Show { uuid } => show(&store, &uuid),
        InstanceCommand::Validate => validate(&store),
    }
}

fn list(store: &dyn InstanceStore) -> CmdResult<InstanceOutput> {
    let instances = store.list()?;
    Ok((
        InstanceOutput {
            command: "instance.list".to_string(),
            instances: Some(instances.iter().map(InstanceSummary::from).collect()),
            instance: None,
            validated: None,
        },
        0,
    ))
}

fn show(store: &dyn InstanceStore, uuid: &str) -> CmdResult<InstanceOutput> {
    let instance = store
        .get_instance_definition(uuid)?
        .ok_or_else(|| Error::instance_not_found(uuid, "instance.show"))?;

    Ok((
        InstanceOutput {
            command: "instance.show".to_string(),
            instances: None,
            instance: Some(instance),
            validated: None,
        },
        0,
    ))
}

fn validate(store: &dyn InstanceStore) -> CmdResult<InstanceOutput> {
    let count = store::validate_fleet(store)?;
    log_status!("store", "{} instance definition(s) valid", count);

    Ok((
        InstanceOutput {
            command: "instance.validate".to_string(),
            instances: None,
            instance: None,
            validated: Some(count),
        },
        0,
    ))
}
