use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::env;
use std::sync::OnceLock;

/// Environment variable holding the maximum log level.
pub const LEVEL_VAR: &str = "MONITOR_LOG";

/// Writes `[LEVEL] target: message` lines to stderr, keeping stdout for the
/// console.
pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Level from [`LEVEL_VAR`], `warn` if unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var(LEVEL_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Warn);
        Self::new(level)
    }

    /// Install as the global logger. Call once.
    ///
    /// # Errors
    /// If a logger is already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| self);
        log::set_logger(logger)?;
        log::set_max_level(logger.max_level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}
