//! Structured logging for semvec.
//!
//! Built on the `tracing` ecosystem. `RUST_LOG` always takes precedence
//! over the configured level.
//!
//! # Usage
//!
//! ```rust
//! use semvec::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::info!("Engine starting");
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Output format for log messages.
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format.
    Pretty,
    /// Compact single-line format.
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            target: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Errors only, no timestamps.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            colors: true,
        }
    }

    /// Debug level with module targets.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            timestamps: true,
            target: true,
            colors: true,
        }
    }

    /// Pick a preset from the CLI verbosity flags. An explicit `level`
    /// replaces the preset's level.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool, level: Option<LogLevel>) -> Self {
        let mut config = if quiet {
            Self::quiet()
        } else if verbose {
            Self::verbose()
        } else {
            Self::default()
        };
        if let Some(level) = level {
            config.level = level;
        }
        config
    }
}

impl LogLevel {
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "e" => Ok(Self::Error),
            "warn" | "warning" | "w" => Ok(Self::Warn),
            "info" | "i" => Ok(Self::Info),
            "debug" | "d" => Ok(Self::Debug),
            "trace" | "t" => Ok(Self::Trace),
            "off" | "none" | "quiet" => Ok(Self::Off),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// Initialize the logging system with the given configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Subsequent calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("semvec={}", config.level.to_filter_string()))
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.target)
        .with_span_events(FmtSpan::NONE);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.pretty())
            .try_init()
            .ok(),
        (LogFormat::Pretty, false) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.pretty().without_time())
            .try_init()
            .ok(),
        (LogFormat::Compact, true) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.compact())
            .try_init()
            .ok(),
        (LogFormat::Compact, false) => tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.compact().without_time())
            .try_init()
            .ok(),
    };
}

/// Initialize logging for tests (silent unless `RUST_LOG` is set).
pub fn init_test_logging() {
    init_logging(&LogConfig {
        level: LogLevel::Off,
        ..Default::default()
    });
}

/// Logs the start and end of a long-running operation.
pub struct OperationGuard {
    name: String,
    start: std::time::Instant,
}

impl OperationGuard {
    /// Start tracking an operation.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(operation = %name, "Starting operation");
        Self {
            name,
            start: std::time::Instant::now(),
        }
    }

    /// Complete the operation successfully.
    pub fn complete(self) {
        tracing::info!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }

    /// Mark the operation as failed.
    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.name,
            duration_ms = self.start.elapsed().as_millis(),
            error = %error,
            "Operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("W".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("none".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(LogConfig::from_flags(true, true, None).level, LogLevel::Error);
        assert_eq!(LogConfig::from_flags(false, true, None).level, LogLevel::Debug);
        assert_eq!(LogConfig::from_flags(false, false, None).level, LogLevel::Info);
    }

    #[test]
    fn test_explicit_level_wins_over_presets() {
        let config = LogConfig::from_flags(false, false, Some(LogLevel::Warn));
        assert_eq!(config.level, LogLevel::Warn);
        let config = LogConfig::from_flags(true, false, Some(LogLevel::Trace));
        assert_eq!(config.level, LogLevel::Trace);
        assert!(!config.timestamps);
        let config = LogConfig::from_flags(false, true, Some(LogLevel::Off));
        assert_eq!(config.level, LogLevel::Off);
    }

    #[test]
    fn test_filter_string() {
        assert_eq!(LogLevel::Trace.to_filter_string(), "trace");
        assert_eq!(LogLevel::Off.to_filter_string(), "off");
    }
}
