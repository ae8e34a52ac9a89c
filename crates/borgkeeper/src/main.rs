//! borgkeeper - Borg backups of Home Assistant platform snapshots
//!
//! This is the main entry point for the add-on's command-line interface.

mod cli;
mod commands;
mod output;

use borgkeeper_core::error::{EXIT_RUN_FAILURE, EXIT_SUCCESS};
use borgkeeper_core::AddonOptions;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    // peek at the debug option so borg's --debug output is not filtered away
    let borg_debug = AddonOptions::load(&cli.global.options)
        .ok()
        .and_then(|options| options.borg_backup_debug)
        .unwrap_or(false);
    init_tracing(cli.verbose, cli.quiet, borg_debug);

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(&cli.global).await,
        Commands::Backup => commands::backup::run(&cli.global).await,
        Commands::Restore => commands::restore::run(&cli.global).await,
        Commands::Check => commands::check::run(&cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit status for a failed command
fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<borgkeeper_core::Error>()
        .map(borgkeeper_core::Error::exit_code)
        .unwrap_or(EXIT_RUN_FAILURE)
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool, borg_debug: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 if borg_debug => EnvFilter::new("debug"),
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use borgkeeper_core::Error;

    #[test]
    fn test_exit_code_from_library_error() {
        assert_eq!(exit_code(&anyhow::Error::from(Error::config("bad"))), 2);
        assert_eq!(
            exit_code(&anyhow::Error::from(Error::repository_auth("denied"))),
            3
        );
        assert_eq!(exit_code(&anyhow::Error::from(Error::NoArchives)), 1);
    }

    #[test]
    fn test_exit_code_survives_context() {
        use anyhow::Context;

        let err = Err::<(), _>(Error::config("missing"))
            .context("Failed to load configuration")
            .unwrap_err();
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_code_for_setup_errors() {
        assert_eq!(exit_code(&anyhow::anyhow!("runtime failure")), EXIT_RUN_FAILURE);
    }
}
