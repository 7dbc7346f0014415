use crate::pipeline::StageName;
use crate::utils::constants::DEFAULT_CONFIG_DIR;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "station-lcz")]
#[command(about = "Resumable LCZ and urban indicator pipeline around weather stations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR, help = "Directory holding default.toml and profile files")]
    pub config_dir: PathBuf,

    #[arg(long, global = true, help = "Configuration profile, else $STATION_LCZ_PROFILE, else default")]
    pub profile: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress bars and informational logs")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline, resuming from what is already on disk
    Run {
        #[arg(short, long = "stage", value_enum, help = "Stage to run, repeatable [default: all stages]")]
        stages: Vec<StageName>,

        #[arg(long, help = "Run stages even when their outputs already exist")]
        force: bool,
    },

    /// Resolve and list the zones of every dataset
    Zones,

    /// Show the on-disk state of every zone without running anything
    Status,

    /// Load, validate and print the effective configuration
    CheckConfig,
}
