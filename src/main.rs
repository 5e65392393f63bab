mod cli;
mod execute;

use clap::Parser;
use colored::Colorize;
use gvm::Settings;
use tracing_subscriber::EnvFilter;
use crate::cli::CLI;
use anyhow::Result;

fn main() {
    let cli = match CLI::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_tracing(&cli);
    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: CLI) -> Result<()> {
    let settings = Settings::from_env()?;
    tracing::debug!(?settings, "resolved settings");
    execute::execute(cli, &settings)
}

fn init_tracing(cli: &CLI) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
