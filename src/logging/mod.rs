//! Logging system initialization and configuration
//!
//! Uses the tracing ecosystem for structured logging with support for:
//! - Environment variable overrides (WANDB_WRITER_LOG filter, level, format, dir)
//! - File output with daily rotation
//! - Console output in pretty, compact or JSON form
//! - In-memory log buffer for inspecting emitted events

pub mod layers;

pub use layers::{LogBuffer, LogBufferLayer, LogEntry};

use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "WANDB_WRITER_LOG";
/// Environment variable selecting the default level
pub const LOG_LEVEL_ENV: &str = "WANDB_WRITER_LOG_LEVEL";
/// Environment variable selecting the console format
pub const LOG_FORMAT_ENV: &str = "WANDB_WRITER_LOG_FORMAT";
/// Environment variable naming a log directory; enables file output
pub const LOG_DIR_ENV: &str = "WANDB_WRITER_LOG_DIR";

/// Default log buffer size
const DEFAULT_LOG_BUFFER_SIZE: usize = 100;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level
    pub level: Level,
    /// Console output format
    pub format: LogFormat,
    /// Show timestamps
    pub timestamps: bool,
    /// Show file and line numbers
    pub file_line: bool,
    /// Enable file output
    pub file_output: bool,
    /// Log file directory path
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            timestamps: true,
            file_line: false,
            file_output: false,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Build a config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Unset or unrecognized values keep the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV).as_deref().and_then(parse_level) {
            config.level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }
        if let Some(dir) = lookup(LOG_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            config.file_output = true;
            config.file_path = Some(PathBuf::from(dir));
        }
        config
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Get the default log directory path
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wandb-writer")
        .join("logs")
}

/// Initialize the logging system
///
/// Returns a `LogBuffer` handle over the most recent events. If a global
/// subscriber is already installed, a warning is printed and the returned
/// buffer stays empty.
///
/// # Environment Variables
/// - `WANDB_WRITER_LOG`: Override log filter (e.g., "wandb_writer=debug")
pub fn init_logging(config: &LoggingConfig) -> LogBuffer {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!("wandb_writer={}", config.level.as_str().to_lowercase()))
    });

    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .boxed(),
        LogFormat::Compact if config.timestamps => fmt::layer()
            .compact()
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().without_time().boxed(),
        LogFormat::Pretty if config.timestamps => fmt::layer()
            .with_target(true)
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).without_time().boxed(),
    };

    let file_layer = if config.file_output {
        let log_dir = config.file_path.clone().unwrap_or_else(default_log_dir);

        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", log_dir, e);
            None
        } else {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &log_dir, "wandb-writer.log");

            let file_layer = fmt::layer()
                .with_writer(file_appender)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);

            Some(file_layer.boxed())
        }
    } else {
        None
    };

    let (log_buffer_layer, log_buffer) = LogBufferLayer::new(DEFAULT_LOG_BUFFER_SIZE);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .with(log_buffer_layer)
        .try_init();

    match installed {
        Ok(()) => tracing::debug!(
            level = %config.level,
            format = ?config.format,
            file_output = config.file_output,
            "Logging initialized"
        ),
        Err(e) => eprintln!("Warning: Logging already initialized: {}", e),
    }

    log_buffer
}

/// Parse a level name, `None` if unrecognized
pub fn parse_level(s: &str) -> Option<Level> {
    s.trim().parse::<Level>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" compact "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("unknown"), None);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("unknown"), None);
    }

    #[test]
    fn test_from_lookup() {
        let config = LoggingConfig::from_lookup(|key| match key {
            LOG_LEVEL_ENV => Some("debug".to_string()),
            LOG_FORMAT_ENV => Some("json".to_string()),
            LOG_DIR_ENV => Some("/tmp/wandb-writer-logs".to_string()),
            _ => None,
        });

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file_output);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/wandb-writer-logs")));
    }

    #[test]
    fn test_from_lookup_keeps_defaults_on_bad_values() {
        let config = LoggingConfig::from_lookup(|key| match key {
            LOG_LEVEL_ENV => Some("loud".to_string()),
            LOG_FORMAT_ENV => Some("xml".to_string()),
            LOG_DIR_ENV => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.file_output);
        assert!(config.file_path.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.timestamps);
        assert!(!config.file_output);
        assert!(config.file_path.is_none());
    }

    #[test]
    fn test_default_log_dir() {
        let dir = default_log_dir();
        assert!(dir.ends_with("wandb-writer/logs"));
    }
}
