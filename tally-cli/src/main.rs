use std::path::PathBuf;

use clap::Parser;

use tally_core::config::CONFIG_FILE;
use tally_core::error::{ConfigError, StoreError, TallyError, ValidationError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Collect PrEP/PEP survey responses and explore the results"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE, env = "TALLY_CONFIG")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error to the process exit code.
///
///   0 success
///   1 general error
///   2 configuration error
///   3 rejected submission (validation or missing consent)
///   4 store failure
///   5 existing store data is corrupt
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<TallyError>() {
            return match e {
                TallyError::Config(_) => 2,
                TallyError::Validation(_) => 3,
                TallyError::Store(StoreError::Corrupt { .. }) => 5,
                TallyError::Store(_) => 4,
                TallyError::Analyze(_) => 1,
            };
        }
        if cause.is::<ConfigError>() {
            return 2;
        }
        if cause.is::<ValidationError>() {
            return 3;
        }
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return if matches!(e, StoreError::Corrupt { .. }) { 5 } else { 4 };
        }
    }
    1
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command, &cli.config) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
