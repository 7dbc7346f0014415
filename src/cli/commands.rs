use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::{PipelineContext, PipelineController, ZoneStatus};
use crate::processors::BufferBuilder;
use crate::utils::constants::{DEFAULT_PROFILE, PROFILE_ENV_VAR};
use crate::utils::format_ordinate;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let profile = cli
        .profile
        .clone()
        .or_else(|| std::env::var(PROFILE_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let config = PipelineConfig::load(&cli.config_dir, &profile)?;

    match cli.command {
        Commands::Run { stages, force } => {
            let mut ctx = PipelineContext::with_subprocess_tools(config)?
                .with_force(force)
                .with_quiet(cli.quiet);
            println!(
                "Profile '{}': {} stations, {} zones",
                profile,
                ctx.stations.len(),
                ctx.plan.len()
            );

            let controller = PipelineController::new(&profile);
            let summary = controller.run(&mut ctx, &stages)?;

            println!("\nRun summary:");
            for stage in &summary.stages {
                println!("  {}", stage.summary());
            }
            println!(
                "Summary written to {}",
                PipelineController::summary_path(&ctx).display()
            );
        }

        Commands::Zones => {
            let ctx = PipelineContext::with_subprocess_tools(config)?.with_quiet(true);
            let builder = BufferBuilder::new(&ctx.config);
            for dataset in ctx.plan.datasets() {
                let zones = ctx.plan.zones(dataset);
                println!("{} ({} zones)", dataset.display_name(), zones.len());
                for zone in zones {
                    let covered = builder.covered_stations(zone, &ctx.stations, zone.epsg)?;
                    println!(
                        "  station {:<8} EPSG:{:<6} bbox [{}, {}, {}, {}] {} ({} stations)",
                        zone.station_id,
                        zone.epsg,
                        format_ordinate(zone.bbox.min_x),
                        format_ordinate(zone.bbox.min_y),
                        format_ordinate(zone.bbox.max_x),
                        format_ordinate(zone.bbox.max_y),
                        zone.directory_name(),
                        covered.len(),
                    );
                }
            }
        }

        Commands::Status => {
            let ctx = PipelineContext::with_subprocess_tools(config)?.with_quiet(true);
            let statuses = ZoneStatus::collect(&ctx)?;
            for status in &statuses {
                println!("{}", status);
            }
            let converted = statuses.iter().filter(|s| s.converted).count();
            let buffered = statuses.iter().filter(|s| s.buffer_file).count();
            println!(
                "\n{} zones: {} converted, {} with buffer files",
                statuses.len(),
                converted,
                buffered
            );
        }

        Commands::CheckConfig => {
            println!("Profile '{}' from {}: configuration is valid", profile, cli.config_dir.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// INFO by default, DEBUG with `--verbose`, WARN with `--quiet`. A log file
/// gets plain text.
fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        None => FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| PipelineError::config(format!("Cannot install logger: {}", e)))
}
