//! Command-line surface: argument parsing and logging setup.
//!
//! The agent's entire configuration surface is its invocation — there is no on-disk config file,
//! unlike a client/server/manager split that would need one.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::constants::DEFAULT_WATCHDOG_TIMEOUT;

#[derive(Debug, Parser)]
#[clap(author, version, about = "Remote filesystem-and-process agent")]
pub struct Opt {
    /// Replace stdin with a built-in scripted command sequence and print replies in
    /// human-readable form instead of the framed binary wire format.
    #[clap(long)]
    pub test: bool,

    /// Emit the built-in scripted command sequence to stdout as bare CBOR records, then exit.
    #[clap(long)]
    pub write: bool,

    /// Unlink the agent's own executable on any exit path that reaches process termination.
    #[clap(long = "delete-on-exit")]
    pub delete_on_exit: bool,

    /// Override the watchdog window (seconds). Defaults to 3600.
    #[clap(long = "watchdog-timeout-secs")]
    pub watchdog_timeout_secs: Option<u64>,

    /// Diagnostic log verbosity. Logs are only ever written when `--log-file` is also given —
    /// standard error is reserved for the reply protocol.
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Path to a file to receive diagnostic logs. Omit to suppress logging entirely.
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

impl Opt {
    pub fn watchdog_timeout(&self) -> Duration {
        self.watchdog_timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_WATCHDOG_TIMEOUT)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Initializes diagnostic logging, returning a handle that must be kept alive for the life of
/// the process. Returns `None` when no log file was configured: no logger is installed at all,
/// so `log`'s macros become no-ops rather than risk a stray write landing on stderr, which is
/// reserved for framed replies.
pub fn init_logging(opt: &Opt) -> Option<flexi_logger::LoggerHandle> {
    use flexi_logger::{FileSpec, Logger};

    let log_file = opt.log_file.as_ref()?;
    let logger = Logger::try_with_str(opt.log_level.as_str())
        .expect("invalid log level spec")
        .log_to_file(FileSpec::try_from(log_file).expect("invalid --log-file path"))
        .format_for_files(flexi_logger::detailed_format);

    Some(logger.start().expect("failed to initialize logger"))
}
