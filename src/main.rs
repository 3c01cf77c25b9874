mod config;
mod figures;
mod manager;
mod model;
mod simulation;
mod solver;
mod utility;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Solve,

    Simulate,

    Plot,

    Run,

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Solve => mgr.solve_model()?,
        Command::Simulate => mgr.simulate_model()?,
        Command::Plot => mgr.plot_results()?,
        Command::Run => {
            mgr.solve_model()?;
            mgr.simulate_model()?;
            mgr.plot_results()?;
        }
        Command::Clean => mgr.clean_sim()?,
    }

    Ok(())
}
