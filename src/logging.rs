//! Logging context writing to a timestamped file and to stdout.
//!
//! Lines look like `2024-01-01 05:30:00,000: db_ops::ops: INFO: table_exists: message`:
//! time in the configured zone, event target, level, innermost span name (or the
//! module path outside any span), then the message and fields.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
pub const DEFAULT_FOLDER: &str = "logs";
pub const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("logging level not valid: {0}")]
    InvalidLogLevel(String),
    #[error("not a valid timezone: {0}")]
    InvalidTimezone(String),
    #[error("a global logger is already installed")]
    AlreadyInstalled,
    #[error("log file error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    /// Logged at error level; `tracing` has nothing above it.
    Critical,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(LoggingError::InvalidLogLevel(s.to_string())),
        }
    }
}

/// Settings for a [`LoggingContext`]; level and timezone are checked when the context is built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub timezone: String,
    pub folder: PathBuf,
    pub file: bool,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            folder: PathBuf::from(DEFAULT_FOLDER),
            file: true,
            console: true,
        }
    }
}

/// Wall-clock time in a fixed zone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedTime {
    tz: Tz,
}

impl ZonedTime {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn format_at(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M:%S,%3f")
            .to_string()
    }

    /// `logs_<YYYYMMDDHHMMSS>.txt` for `instant` in this zone.
    pub fn log_file_name(&self, instant: DateTime<Utc>) -> String {
        format!(
            "logs_{}.txt",
            instant.with_timezone(&self.tz).format("%Y%m%d%H%M%S")
        )
    }
}

impl FormatTime for ZonedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        w.write_str(&self.format_at(Utc::now()))
    }
}

/// `time: target: LEVEL: function: message`
#[derive(Debug, Clone, Copy)]
pub struct LineFormat {
    timer: ZonedTime,
}

impl LineFormat {
    pub fn new(timer: ZonedTime) -> Self {
        Self { timer }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let function = ctx
            .event_scope()
            .and_then(|mut scope| scope.next())
            .map(|span| span.name())
            .or_else(|| meta.module_path())
            .unwrap_or("-");

        self.timer.format_time(&mut writer)?;
        write!(
            writer,
            ": {}: {}: {}: ",
            meta.target(),
            level_name(meta.level()),
            function
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_name(level: &Level) -> &'static str {
    if *level == Level::WARN {
        "WARNING"
    } else {
        level.as_str()
    }
}

/// A configured logger, created once and handed to whatever should log through it.
///
/// Nothing is global until [`LoggingContext::install_global`] is called.
pub struct LoggingContext {
    dispatch: Dispatch,
    level: LogLevel,
    timezone: Tz,
    log_file: Option<PathBuf>,
}

impl LoggingContext {
    pub fn new(config: &LoggingConfig) -> Result<Self, LoggingError> {
        let level: LogLevel = config.level.parse()?;
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|_| LoggingError::InvalidTimezone(config.timezone.clone()))?;
        let timer = ZonedTime::new(timezone);

        let (file_layer, log_file) = if config.file {
            fs::create_dir_all(&config.folder)?;
            let path = config.folder.join(timer.log_file_name(Utc::now()));
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(LineFormat::new(timer))
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        } else {
            (None, None)
        };

        let console_layer = config.console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(LineFormat::new(timer))
                .with_writer(io::stdout)
        });

        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(level.directive()))
            .with(file_layer)
            .with(console_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            level,
            timezone,
            log_file,
        })
    }

    /// Make this context the process-wide default. Only the first install succeeds.
    pub fn install_global(&self) -> Result<(), LoggingError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LoggingError::AlreadyInstalled)
    }

    /// Run `f` with this context as the current dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
