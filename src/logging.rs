//! Process-wide log sink.
//!
//! Events go to the console and, optionally, to a log file whose lines carry
//! an `HH:MM:SS` timestamp. The filter comes from `SEQPATCH_LOG` when set.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const ENV_FILTER_VAR: &str = "SEQPATCH_LOG";
const DEFAULT_DIRECTIVE: &str = "seqpatch=info";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Include event targets and source locations in every line.
    pub debug_mode: bool,
    pub log_file: Option<PathBuf>,
    /// Explicit filter directives; overrides `SEQPATCH_LOG`.
    pub filter: Option<String>,
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter '{directives}': {message}")]
    InvalidFilter { directives: String, message: String },

    #[error("a global log sink is already installed")]
    AlreadyInstalled,
}

impl LogConfig {
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let directives = match &self.filter {
            Some(filter) => filter.clone(),
            None => std::env::var(ENV_FILTER_VAR).unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_string()),
        };
        EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter {
            directives,
            message: e.to_string(),
        })
    }
}

/// Install the global sink.
///
/// A log file that cannot be created is reported as a warning and the sink
/// falls back to console only.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter()?;

    let (file, file_error) = match &config.log_file {
        Some(path) => match File::create(path) {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some(format!("{}: {}", path.display(), e))),
        },
        None => (None, None),
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.debug_mode)
        .with_file(config.debug_mode)
        .with_line_number(config.debug_mode)
        .without_time();

    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(config.debug_mode)
            .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    if let Some(message) = file_error {
        warn!("Could not open log file {}; logging to console only", message);
    }

    Ok(())
}
