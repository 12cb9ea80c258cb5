//! Structured logging setup for the lands node
//!
//! Console output is human-readable by default; file output is always JSON
//! lines so it can be shipped to a log aggregator. `RUST_LOG` overrides the
//! configured filter when set.
//!
//! ```ignore
//! use lands_logging::{LandsSubscriberBuilder, LogConfig};
//!
//! let _guard = LandsSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Errors from subscriber setup
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("log appender error: {0}")]
    Appender(#[from] InitError),

    #[error("global subscriber already set: {0}")]
    Init(#[from] TryInitError),
}

/// Builder for configuring and initializing the logging subscriber
pub struct LandsSubscriberBuilder {
    config: LogConfig,
}

impl LandsSubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Try to initialize the subscriber globally
    ///
    /// The returned guard flushes the file writer when dropped and must be
    /// kept alive for as long as the program logs.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let filter = self.env_filter()?;
        let (layers, guard) = self.layers()?;

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()?;
        Ok(guard)
    }

    /// Initialize the subscriber, reporting setup failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: failed to initialize logging: {e}");
                None
            }
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, LogError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.config.filter_directives()))
            .map_err(|e| LogError::Filter(e.to_string()))
    }

    fn layers(&self) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LogError> {
        let mut layers = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            let console = if self.config.console.pretty {
                tracing_subscriber::fmt::layer()
                    .with_ansi(self.config.console.ansi)
                    .with_target(true)
                    .boxed()
            } else {
                jsonl_layer(&self.config.jsonl, std::io::stdout)
            };
            layers.push(console);
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(jsonl_layer(&self.config.jsonl, writer));
            guard = Some(file_guard);
        }

        Ok((layers, guard))
    }
}

impl Default for LandsSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn jsonl_layer<W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

/// Non-blocking writer for the configured file; `Never` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.clone())
        .filename_suffix("log");
    if let Some(max) = config.max_files {
        builder = builder.max_log_files(max);
    }
    Ok(tracing_appender::non_blocking(builder.build(&config.directory)?))
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Option<WorkerGuard> {
    LandsSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for tests; a subscriber that is already set is kept
pub fn init_testing() {
    let _ = LandsSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = LandsSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
    }

    #[test]
    fn test_builder_with_level() {
        let builder = LandsSubscriberBuilder::new().with_level("trace");
        assert_eq!(builder.config().default_level, "trace");
    }

    #[test]
    fn test_layers_follow_config() {
        let (layers, guard) = LandsSubscriberBuilder::new().with_console(false).layers().unwrap();
        assert!(layers.is_empty());
        assert!(guard.is_none());

        let (layers, _) = LandsSubscriberBuilder::new().layers().unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn test_file_writer_never_truncates_single_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = FileConfig {
            directory: dir.path().join("nested"),
            rotation: RotationStrategy::Never,
            ..FileConfig::default()
        };
        fs::create_dir_all(&config.directory).unwrap();
        fs::write(config.directory.join("lands.log"), "stale").unwrap();

        let (_writer, guard) = file_writer(&config).unwrap();
        drop(guard);

        let contents = fs::read_to_string(config.directory.join("lands.log")).unwrap();
        assert!(contents.is_empty());
    }
}
