//! Logging setup
//!
//! Installs a `tracing` subscriber with one of three output formats, an
//! optional daily-rotated log file, and `RUST_LOG` override.
//!
//! ```rust,no_run
//! use bittensor_pow::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(&LoggingConfig::from_env().with_format(LogFormat::Compact));
//! ```

pub mod format;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Once, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub use format::{CompactFormatter, JsonFormatter, TextFormatter};

static INIT: Once = Once::new();

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Keeps the non-blocking file writer flushing for the life of the process
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "pow_register.log";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `YYYY-MM-DD HH:MM:SS | LEVEL | target | message`
    #[default]
    Text,
    Json,
    /// `[LEVEL] message`
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!(
                "Invalid log format '{}'. Valid options: text, json, compact",
                s
            )),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level DEBUG
    pub debug: bool,
    /// Minimum level TRACE, wins over `debug`
    pub trace: bool,
    /// Also write to a daily-rotated file under `logging_dir`
    pub record_log: bool,
    /// Directory for log files (supports `~`)
    pub logging_dir: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            trace: false,
            record_log: false,
            logging_dir: "~/.bittensor/logs".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_file_logging(mut self, enabled: bool) -> Self {
        self.record_log = enabled;
        self
    }

    pub fn with_logging_dir(mut self, dir: impl Into<String>) -> Self {
        self.logging_dir = dir.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Defaults overridden by environment variables
    ///
    /// - `BITTENSOR_DEBUG`: debug level (any value)
    /// - `BITTENSOR_TRACE`: trace level (any value)
    /// - `BITTENSOR_LOG_FORMAT`: text, json or compact
    /// - `BITTENSOR_LOG_DIR`: log directory, enables file logging
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Apply the environment overrides of [`LoggingConfig::from_env`] on top of `self`.
    pub fn apply_env(mut self) -> Self {
        if std::env::var("BITTENSOR_DEBUG").is_ok() {
            self.debug = true;
        }

        if std::env::var("BITTENSOR_TRACE").is_ok() {
            self.debug = true;
            self.trace = true;
        }

        if let Ok(format) = std::env::var("BITTENSOR_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.format = f;
            }
        }

        if let Ok(dir) = std::env::var("BITTENSOR_LOG_DIR") {
            self.logging_dir = dir;
            self.record_log = true;
        }

        self
    }

    fn level(&self) -> Level {
        if self.trace {
            Level::TRACE
        } else if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn expand_path(&self) -> PathBuf {
        let path = &self.logging_dir;
        if let Some(stripped) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        PathBuf::from(path)
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        install(config);
        INITIALIZED.store(true, Ordering::SeqCst);
    });
}

/// [`init_logging`] with INFO level text output.
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer()
            .event_format(TextFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .event_format(JsonFormatter)
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(CompactFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
    }
}

fn install(config: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!(
            "{},jsonrpsee=warn,soketto=warn,subxt=warn",
            config.level()
        ))
    };

    let mut layers: Vec<BoxedLayer> = vec![output_layer(config.format, io::stdout, true)];

    if config.record_log {
        let log_dir = config.expand_path();
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(output_layer(config.format, writer, false));
            }
            Err(e) => eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            ),
        }
    }

    // Another subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.debug);
        assert!(!config.trace);
        assert!(!config.record_log);
        assert_eq!(config.logging_dir, "~/.bittensor/logs");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_level_precedence() {
        assert_eq!(LoggingConfig::default().level(), Level::INFO);
        assert_eq!(LoggingConfig::default().with_debug(true).level(), Level::DEBUG);
        assert_eq!(
            LoggingConfig::default()
                .with_debug(true)
                .with_trace(true)
                .level(),
            Level::TRACE
        );
    }

    #[test]
    fn test_expand_path() {
        assert!(!LoggingConfig::default()
            .expand_path()
            .to_string_lossy()
            .starts_with('~'));
        let config = LoggingConfig::default().with_logging_dir("/var/log/pow");
        assert_eq!(config.expand_path(), PathBuf::from("/var/log/pow"));
    }

    #[test]
    fn test_format_serde_lowercase() {
        let json = serde_json::to_string(&LogFormat::Compact).unwrap();
        assert_eq!(json, "\"compact\"");
    }
}
