//! webask - ask a web chat assistant and extract its structured answer
//!
//! Main entry point for the webask CLI.

mod adapters;
mod cli;
mod cmd_ask;
mod cmd_config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use webask_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands, USAGE};

/// Initialize tracing: stderr always, a daily rolling file when enabled.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the JSON result only
    let console = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let file = if logging.file {
        let log_dir = PathBuf::from(ConfigLoader::expand_path(&logging.dir));
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("webask")
            .filename_suffix("log")
            .max_log_files(14)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keep the worker alive for the program duration
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Usage => {
            println!("{}", USAGE);
            Ok(0)
        }
        Commands::CheckConfig => cmd_config::check_config(&cli.config),
        Commands::Ask(args) => ask(args, &cli.config, cli.verbose).await,
    };

    match code {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn ask(
    args: cli::AskArgs,
    config_path: &std::path::Path,
    verbose: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(config_path)?;
    init_tracing(&config.logging, verbose)?;
    info!("webask v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; cancelling");
            on_signal.cancel();
        }
    });

    cmd_ask::run_ask(args, config, cancel).await
}
