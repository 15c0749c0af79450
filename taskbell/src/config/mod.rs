//! Configuration for the `taskbell` CLI.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskbell/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};

use crate::commands::Command;
use crate::reminder::scheduler::DEFAULT_TICK_INTERVAL;
use crate::view::SortKey;

/// Default time between task file reloads while watching.
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 5;

/// Default chrono format for displayed instants.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// No data directory was given and none could be derived.
    #[error("could not determine data directory; pass --data-dir or set TASKBELL_DATA_DIR")]
    NoDataDir,

    /// An interval was configured as zero.
    #[error("`{0}` must be greater than zero")]
    ZeroInterval(&'static str),

    /// The timestamp format contains a specifier chrono does not know.
    #[error("invalid timestamp format `{0}`")]
    InvalidTimestampFormat(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    reminders: RemindersFileConfig,
    ui: UiFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

/// `[reminders]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemindersFileConfig {
    tick_interval_secs: Option<u64>,
    reload_interval_secs: Option<u64>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    timestamp_format: Option<String>,
    default_sort: Option<SortKey>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Directory holding the persisted keys.
    pub data_dir: PathBuf,
    /// Time between reminder evaluations.
    pub tick_interval: Duration,
    /// Time between task file reloads in `watch`.
    pub reload_interval: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
    /// Sort used by `list` when `--sort` is not given.
    pub default_sort: SortKey,
}

impl ClientConfig {
    /// Builds a configuration around `data_dir` with every other field at
    /// its default.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            reload_interval: Duration::from_secs(DEFAULT_RELOAD_INTERVAL_SECS),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            default_sort: SortKey::default(),
        }
    }

    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// an interval is zero, or no data directory can be determined.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file, dirs::data_dir().map(|d| d.join("taskbell")))
    }

    /// Priority: CLI > file > default. Separated from `load()` so it can
    /// be tested without touching the filesystem.
    fn resolve(
        cli: &CliArgs,
        file: &ConfigFile,
        default_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| file.storage.data_dir.clone())
            .or(default_data_dir)
            .ok_or(ConfigError::NoDataDir)?;
        let defaults = Self::with_data_dir(data_dir);

        Ok(Self {
            tick_interval: interval_secs(
                "tick_interval_secs",
                file.reminders.tick_interval_secs,
                defaults.tick_interval,
            )?,
            reload_interval: interval_secs(
                "reload_interval_secs",
                file.reminders.reload_interval_secs,
                defaults.reload_interval,
            )?,
            timestamp_format: checked_timestamp_format(
                cli.timestamp_format
                    .clone()
                    .or_else(|| file.ui.timestamp_format.clone())
                    .unwrap_or_else(|| defaults.timestamp_format.clone()),
            )?,
            default_sort: file.ui.default_sort.unwrap_or(defaults.default_sort),
            ..defaults
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal task manager with due-date reminders")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskbell/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the task list and preferences are stored in.
    #[arg(long, global = true, env = "TASKBELL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long, global = true)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKBELL_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskbell.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do; lists tasks when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn checked_timestamp_format(format: String) -> Result<String, ConfigError> {
    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidTimestampFormat(format));
    }
    Ok(format)
}

fn interval_secs(
    name: &'static str,
    configured: Option<u64>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match configured {
        Some(0) => Err(ConfigError::ZeroInterval(name)),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskbell").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
