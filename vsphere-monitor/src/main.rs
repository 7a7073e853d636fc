use clap::Parser;
use std::time::Duration;
use tracing::debug;

pub mod cli;
pub mod config;
pub mod error;
pub mod listen;
pub mod logging;
pub mod signal;

use cli::{Cli, Command};
use config::{FileConfig, ListenSettings};
use error::CliError;

/// How long abandoned blocking calls may hold up process exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            e.report();
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<(), CliError> {
    let file = cli.config.as_deref().map(FileConfig::load).transpose();

    // Verbosity from a readable file still counts, so load it first
    let file_flags = match &file {
        Ok(Some(config)) => (config.debug.unwrap_or(false), config.verbose.unwrap_or(false)),
        _ => (false, false),
    };
    logging::init(cli.debug || file_flags.0, cli.verbose || file_flags.1);
    debug!(command = ?cli::redact_args(std::env::args_os()), "Command executed");

    let file = file.map_err(CliError::Config)?.unwrap_or_default();

    match cli.command {
        Command::Listen(args) => {
            let settings = ListenSettings::resolve(&args, &file)?;
            settings.log_summary();

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(CliError::Runtime)?;
            let result = runtime.block_on(listen::run(settings));

            // A long poll may still be blocked in the transport
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            result
        }
    }
}
