use std::fs::File;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pagemark::cli::{self, Cli};
use pagemark::panic_handler::initialize_panic_handler;
use pagemark::settings;

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let file = File::create(&cli.log_file)
        .with_context(|| format!("creating log file {:?}", cli.log_file))?;
    WriteLogger::init(level, Config::default(), file).context("installing logger")?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
    initialize_panic_handler();

    info!("Starting pagemark {}", env!("CARGO_PKG_VERSION"));
    match &cli.config {
        Some(path) => settings::load_settings_at(path),
        None => settings::load_settings(),
    }

    if let Err(e) = cli::run(cli) {
        error!("{e:#}");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
