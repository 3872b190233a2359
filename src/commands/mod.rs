use std::path::PathBuf;

use stagecraft::defaults::{self, StagecraftConfig};
use stagecraft::store::JsonDirStore;

pub type CmdResult<T> = stagecraft::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit stagecraft.json; the global one is used otherwise.
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> stagecraft::Result<StagecraftConfig> {
        defaults::load_config(self.config.as_deref())
    }

    /// Instance store configured by `instancesDir` and `defaultSshPort`.
    pub fn store(&self, config: &StagecraftConfig) -> stagecraft::Result<JsonDirStore> {
        let dir = config.defaults.instances_path()?;
        Ok(JsonDirStore::new(dir).with_default_ssh_port(config.defaults.default_ssh_port))
    }
}

pub mod config;
pub mod instance;
pub mod stage;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (stagecraft::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Stage(args) => dispatch!(args, global, stage),
        crate::Commands::Instance(args) => dispatch!(args, global, instance),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
