//! `taskbell`: terminal task manager with due-date reminders.
//!
//! Tasks and the reminder preference live in the data directory
//! (`--data-dir`, `TASKBELL_DATA_DIR`, or the platform data dir).
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskbell/config.toml`).
//!
//! ```bash
//! taskbell add "Pay rent" --due "2025-07-01 09:00" -p high
//! taskbell list --status pending --sort priority
//! taskbell notify on
//! taskbell watch
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskbell::clock::SystemClock;
use taskbell::commands::{Command, ListArgs, Session};
use taskbell::config::{CliArgs, ClientConfig};
use taskbell::notify::ConsoleGateway;
use taskbell::store::FileKv;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Logs go to a file so stdout stays reserved for command output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}");
            let Some(data_dir) = cli
                .data_dir
                .clone()
                .or_else(|| dirs::data_dir().map(|d| d.join("taskbell")))
            else {
                eprintln!("error: could not determine data directory; pass --data-dir");
                return ExitCode::FAILURE;
            };
            ClientConfig::with_data_dir(data_dir)
        }
    };

    tracing::info!(data_dir = %config.data_dir.display(), "taskbell starting");

    let kv = FileKv::new(&config.data_dir);
    let gateway = Arc::new(ConsoleGateway::detect());
    let mut session = Session::open(kv, gateway, Arc::new(SystemClock), config);

    let command = cli
        .command
        .unwrap_or_else(|| Command::List(ListArgs::default()));

    let mut stdout = io::stdout().lock();
    let result = session.run(command, &mut stdout).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, which carries command output).
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskbell.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
