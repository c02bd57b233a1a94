use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log severity accepted by `--loglevel`, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("not a valid log level: {0:?} (expected one of: debug|info|warn|error)")]
pub struct ParseLevelError(pub String);

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        LevelFilter::from_level(level.into())
    }
}

/// Effective logging configuration of the process.
///
/// Built once from `--loglevel` and handed to every component that emits
/// logs. Only [`LogSettings::install`] touches the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    level: LogLevel,
}

impl LogSettings {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn parse(level: &str) -> Result<Self, ParseLevelError> {
        level.parse().map(Self::new)
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn filter(&self) -> EnvFilter {
        EnvFilter::default().add_directive(LevelFilter::from(self.level).into())
    }

    /// Installs the process-wide subscriber writing to stderr.
    ///
    /// Returns `false` when a subscriber was already installed (e.g. by an
    /// earlier test in the same process); the existing one is kept.
    pub fn install(&self) -> bool {
        tracing_subscriber::registry()
            .with(self.filter())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    }
}
