//! Process configuration (§6/§8): the CLI wrapper's argument contract,
//! matching the distilled original's `hostname`, `port`, `--logfile`,
//! `--loglevel` surface.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

/// Accepts execution requests for a unit-test run and serializes the
/// resulting object graphs.
#[derive(Debug, Parser)]
#[command(name = "deepdump-executor")]
pub struct Config {
    /// Interface to listen on.
    pub hostname: String,

    /// Port to listen on.
    pub port: u16,

    /// Optional file to write logs to; stderr otherwise.
    #[arg(long)]
    pub logfile: Option<String>,

    /// Minimum log level.
    #[arg(long, value_enum, default_value_t = LogLevel::Error)]
    pub loglevel: LogLevel,
}

/// Install a `tracing-subscriber` filter/writer matching `config`. The
/// distilled original's format string
/// (`%(asctime)s | %(levelname)s | %(funcName)s - %(message)s`) has no
/// literal `tracing` equivalent; the `compact` formatter used here carries
/// the same fields (timestamp, level, target/function, message).
pub fn init_logging(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(config.loglevel.as_filter());
    let builder = fmt().with_env_filter(filter).with_target(true);

    match &config.logfile {
        Some(path) => {
            if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
                builder.with_writer(std::sync::Mutex::new(file)).init();
                return;
            }
            builder.init();
        }
        None => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_maps_to_filter_string() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Error.as_filter(), "error");
    }
}
