//! Logging System
//!
//! Structured diagnostics through `tracing`. Store failures are logged at
//! `error`, data inconsistencies (orphans, duplicate ids, cycles) at `warn`.
//! Level, format and destination come from [`LoggingConfig`]; the
//! `MRTOOLS_LOG`, `MRTOOLS_LOG_FORMAT` and `MRTOOLS_LOG_OUTPUT` environment
//! variables take precedence.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt as stdfmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_NAME: &str = "mrtools.log";

/// Rendering of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ApiError::ConfigError(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
    /// Log file plus stderr
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    /// Stdout plus stderr
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }
}

impl FromStr for LogOutput {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(ApiError::ConfigError(format!(
                "unknown log output '{}' (expected stdout, stderr, file, file+stderr or both)",
                other
            ))),
        }
    }
}

impl stdfmt::Display for LogOutput {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        let name = match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
            LogOutput::FileAndStderr => "file+stderr",
            LogOutput::Both => "both",
        };
        f.write_str(name)
    }
}

/// `[logging]` section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level: trace, debug, info, warn, error or off
    pub level: String,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file used by the file outputs; the platform state dir when unset
    pub file: Option<PathBuf>,

    /// ANSI colors for text written to a terminal stream
    pub color: bool,

    /// Per-target levels, e.g. `"mrtools::store" = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: None,
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

/// Log file location: `MRTOOLS_LOG_FILE`, then the configured file, then
/// `mrtools.log` in the platform state directory.
pub fn resolve_log_file_path(configured: Option<PathBuf>) -> Result<PathBuf, ApiError> {
    let from_env = std::env::var("MRTOOLS_LOG_FILE")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let configured = configured.filter(|p| !p.as_os_str().is_empty());
    match from_env.or(configured) {
        Some(path) => Ok(path),
        None => default_log_file_path(),
    }
}

fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let dirs = directories::ProjectDirs::from("", "", "mrtools").ok_or_else(|| {
        ApiError::ConfigError("no home directory to place the log file in".to_string())
    })?;
    // only Linux has a state dir
    let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(dir.join(LOG_FILE_NAME))
}

/// Install the global `tracing` subscriber.
///
/// Environment variables override `config`; without a config the defaults
/// apply. Fails if a subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = env_filter(config)?;
    let format = env_override("MRTOOLS_LOG_FORMAT")?.unwrap_or(config.format);
    let output = env_override("MRTOOLS_LOG_OUTPUT")?.unwrap_or(config.output);
    let writer = make_writer(output, config.file.clone())?;

    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);
    let installed = match format {
        LogFormat::Json => Registry::default().with(filter).with(layer.json()).try_init(),
        LogFormat::Text => Registry::default()
            .with(filter)
            .with(layer.with_ansi(config.color && !output.writes_file()))
            .try_init(),
    };
    installed.map_err(|e| ApiError::ConfigError(format!("logger already installed: {}", e)))
}

fn env_override<T: FromStr<Err = ApiError>>(name: &str) -> Result<Option<T>, ApiError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

/// `MRTOOLS_LOG` when set, else the configured level plus module directives
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env("MRTOOLS_LOG") {
        return Ok(filter);
    }
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ApiError::ConfigError(format!("bad log level '{}': {}", config.level, e)))?;
    for (target, level) in &config.modules {
        let directive = format!("{}={}", target, level)
            .parse::<Directive>()
            .map_err(|e| ApiError::ConfigError(format!("bad directive for {}: {}", target, e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn make_writer(output: LogOutput, file: Option<PathBuf>) -> Result<BoxMakeWriter, ApiError> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Both => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        LogOutput::File => BoxMakeWriter::new(open_log_file(file)?),
        LogOutput::FileAndStderr => BoxMakeWriter::new(open_log_file(file)?.and(std::io::stderr)),
    })
}

fn open_log_file(configured: Option<PathBuf>) -> Result<std::sync::Mutex<std::fs::File>, ApiError> {
    let path = resolve_log_file_path(configured)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            ApiError::ConfigError(format!("cannot create log directory {}: {}", dir.display(), e))
        })?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ApiError::ConfigError(format!("cannot open log file {}: {}", path.display(), e)))?;
    Ok(std::sync::Mutex::new(file))
}
