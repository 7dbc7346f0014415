use anyhow::Context;
use clap::Parser;
use station_lcz::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("station-lcz failed")
}
