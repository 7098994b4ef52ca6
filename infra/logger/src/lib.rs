//! # Logger
//!
//! Console and rolling-file logging for RegoCraft processes, configured from
//! the `logging` section of the server config.
//!
//! * `level` is the default directive, `env_filter` adds per-target directives
//!   (e.g. `"rego_kernel=debug,hyper=info"`) and `RUST_LOG` applies when neither is set.
//! * `json` switches every enabled layer to JSON lines.
//! * `directory` enables a daily rolling file (`<name>.<date>.log`) written by a
//!   non-blocking worker. Keep the returned [`Logger`] alive so it can flush.
//!
//! ## Example
//!
//! ```rust
//! use rego_domain::config::LoggingConfig;
//! use rego_logger::Logger;
//!
//! let config = LoggingConfig { level: "debug".to_owned(), ..LoggingConfig::default() };
//! let _logger = Logger::builder("regocraft").config(&config).init().unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use rego_domain::config::LoggingConfig;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    console: bool,
    json: bool,
    level: String,
    env_filter: Option<String>,
    path: Option<PathBuf>,
    rotation: Rotation,
    max_files: usize,
}

impl LoggerBuilder {
    /// Copies every setting of the `logging` config section.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn config(mut self, config: &LoggingConfig) -> Self {
        self.console = config.console;
        self.json = config.json;
        self.level.clone_from(&config.level);
        self.env_filter.clone_from(&config.env_filter);
        self.path.clone_from(&config.directory);
        self.max_files = config.max_files;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Invalid filters make [`LoggerBuilder::init`] return an error.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Consumes the builder and installs the global tracing subscriber.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber has already been set.
    /// Returns [`LoggerError::InvalidConfiguration`] for invalid builder settings.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let level = self.validate()?;
        let env_filter = build_env_filter(level, self.env_filter.as_deref())?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.console {
            let console = layer().with_ansi(!self.json);
            layers.push(if self.json { console.json().boxed() } else { console.compact().boxed() });
        }

        let guard = if let Some(path) = self.path {
            fs::create_dir_all(&path).map_err(|e| LoggerError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Failed to create path: {}", path.display()).into()),
            })?;

            let file_appender = RollingFileAppender::builder()
                .rotation(self.rotation)
                .filename_prefix(&self.name)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(self.max_files)
                .build(path)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file = layer().with_writer(non_blocking).with_ansi(false);
            layers.push(if self.json { file.json().boxed() } else { file.boxed() });
            Some(guard)
        } else {
            None
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging layers enabled. Enable console or set a log directory.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(layers).with(env_filter).try_init()?;

        Ok(Logger { guard })
    }

    fn validate(&self) -> Result<LevelFilter, LoggerError> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }
        if self.max_files == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: "max_files must be greater than zero".into(),
                context: None,
            });
        }
        LevelFilter::from_str(&self.level).map_err(|_| LoggerError::InvalidConfiguration {
            message: format!("Unknown log level '{}'", self.level).into(),
            context: Some("logging.level".into()),
        })
    }
}

/// Handle to the installed logging system. Dropping it flushes the file worker.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// The `name` prefixes rolling log files (e.g., `regocraft.2026-10-14.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        let defaults = LoggingConfig::default();
        LoggerBuilder {
            name: name.into(),
            console: defaults.console,
            json: defaults.json,
            level: defaults.level,
            env_filter: defaults.env_filter,
            path: defaults.directory,
            rotation: Rotation::DAILY,
            max_files: defaults.max_files,
        }
    }

    /// Whether a file worker is attached.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn build_env_filter(level: LevelFilter, filter: Option<&str>) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    filter.map_or_else(
        || Ok(builder.from_env_lossy()),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_copies_the_logging_section() {
        let config = LoggingConfig {
            level: "debug".to_owned(),
            env_filter: Some("rego_kernel=trace".to_owned()),
            console: false,
            json: true,
            directory: Some(PathBuf::from("/var/log/regocraft")),
            max_files: 3,
        };
        let builder = Logger::builder("regocraft").config(&config);

        assert!(!builder.console);
        assert!(builder.json);
        assert_eq!(builder.level, "debug");
        assert_eq!(builder.env_filter.as_deref(), Some("rego_kernel=trace"));
        assert_eq!(builder.path.as_deref(), Some(std::path::Path::new("/var/log/regocraft")));
        assert_eq!(builder.max_files, 3);
    }

    #[test]
    #[serial]
    fn unknown_level_is_rejected_before_install() {
        let err = Logger::builder("regocraft").level("loud").init().unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
        assert!(err.to_string().contains("(logging.level)"));
    }

    #[test]
    #[serial]
    fn no_layers_is_rejected() {
        let err = Logger::builder("regocraft").console(false).init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    #[serial]
    fn bad_env_filter_is_rejected() {
        let err = Logger::builder("regocraft")
            .env_filter("rego_kernel=notalevel")
            .init()
            .unwrap_err();
        assert!(err.to_string().contains("Invalid env filter"));
    }
}
