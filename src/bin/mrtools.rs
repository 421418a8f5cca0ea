//! MRTools CLI Binary
//!
//! Admin command line for an FMEA reliability database.

use anyhow::Context;
use clap::Parser;
use mrtools::config::ConfigLoader;
use mrtools::logging::init_logging;
use mrtools::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = ConfigLoader::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.parse()?;
    }
    if let Some(database) = cli.database {
        config.database = database;
    }
    init_logging(Some(&config.logging)).context("initializing logging")?;

    let mut context = CliContext::from_config(config).context("opening database")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
