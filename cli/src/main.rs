mod cli;
mod commands;
mod daemon;

use clap::Parser;
use cli::{Cli, Command};
use overseer_infrastructure::ConfigLoader;
use std::path::Path;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        match ConfigLoader::load(cli.config.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: failed to load configuration: {e}");
                return ExitCode::from(commands::EXIT_VALIDATION);
            }
        }
    };

    // Only the daemon logs to a file; client commands stay on stderr.
    let log_file = match cli.command {
        Command::Daemon => config.daemon.log_file.clone(),
        _ => None,
    };
    let _log_guard = init_tracing(cli.verbose, log_file.as_deref());

    match cli.command {
        Command::Daemon => match daemon::run(config, cli.socket).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
        command => {
            let socket_path = commands::resolve_socket_path(cli.socket, &config);
            match commands::run(command, socket_path, cli.json).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Verbosity flags map to a default filter; `RUST_LOG` wins when set.
/// Returns the appender guard when logging to a file; it must stay alive
/// for the lifetime of the process or buffered lines are lost.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path.file_name().unwrap_or_else(|| "overseer.log".as_ref());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder.with_writer(writer).with_ansi(false).init();
            Some(guard)
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            None
        }
    }
}
