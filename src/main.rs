use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{config, instance, stage};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stagecraft")]
#[command(version = VERSION)]
#[command(about = "Compose per-stage deployment scripts for an instance fleet")]
struct Cli {
    /// Path to stagecraft.json (defaults to ~/.config/stagecraft/stagecraft.json)
    #[arg(long, global = true, env = "STAGECRAFT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose and persist the script for one pipeline stage
    Stage(stage::StageArgs),
    /// Inspect the instance store
    #[command(visible_alias = "instances")]
    Instance(instance::InstanceArgs),
    /// Show stagecraft configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
