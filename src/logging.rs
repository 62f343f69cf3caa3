//! Structured logging for the long-poll benchmark
//!
//! stdout belongs to the result line and the progress CSV, so every log entry
//! goes to stderr. Entries carry a level, the logger name, the run id handed
//! out by [`LoggerFactory`] and a sorted set of typed fields.
//!
//! Writes are best-effort: a failed write is ignored and never surfaces to the
//! caller, so logging cannot stall a session under test.

use crate::error::AppError;
use crate::models::{Config, Trial};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn colored(&self) -> String {
        let label = format!("{:>5}", self.as_str());
        match self {
            LogLevel::Debug => label.cyan().to_string(),
            LogLevel::Info => label.green().to_string(),
            LogLevel::Warn => label.yellow().to_string(),
            LogLevel::Error => label.red().bold().to_string(),
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable line
    Console,
    /// One JSON object per line
    Json,
}

/// Named logger with a level threshold
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    /// `None` silences the logger entirely
    min_level: Option<LogLevel>,
    use_color: bool,
    format: LogFormat,
    run_id: Option<String>,
}

impl Logger {
    pub fn new(name: &str, min_level: LogLevel) -> Self {
        Self {
            name: name.to_string(),
            min_level: Some(min_level),
            use_color: false,
            format: LogFormat::Console,
            run_id: None,
        }
    }

    /// Threshold follows the verbosity flags: warn by default, info with
    /// `--verbose`, debug with `--debug`
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            name: name.to_string(),
            min_level: Some(min_level),
            use_color: config.enable_color,
            format: if config.json { LogFormat::Json } else { LogFormat::Console },
            run_id: None,
        }
    }

    /// A logger that writes nothing
    pub fn quiet(name: &str) -> Self {
        Self {
            min_level: None,
            ..Self::new(name, LogLevel::Error)
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        self.min_level.is_some_and(|min| level >= min)
    }

    /// Start an entry; below the threshold nothing is allocated
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        let entry = self.would_log(level).then(|| LogEntry {
            timestamp: Utc::now(),
            level,
            logger: self.name.clone(),
            message: message.to_string(),
            run_id: self.run_id.clone(),
            fields: BTreeMap::new(),
        });
        LogEntryBuilder { logger: self, entry }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => serde_json::to_string(entry)
                .unwrap_or_else(|_| format!("{{\"message\":{:?}}}", entry.message)),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let level = if self.use_color {
            entry.level.colored()
        } else {
            format!("{:>5}", entry.level.as_str())
        };

        let mut output = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%H:%M:%S%.6f"),
            level,
            entry.logger,
            entry.message
        );

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }
        output
    }

    async fn write_entry(&self, entry: &LogEntry) {
        let mut line = self.render(entry);
        line.push('\n');
        let mut stderr = tokio::io::stderr();
        let _ = stderr.write_all(line.as_bytes()).await;
    }
}

/// Collects fields for one entry; `entry` is `None` below the threshold
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: Option<LogEntry>,
}

impl LogEntryBuilder<'_> {
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Some(entry) = self.entry.as_mut() {
            if let Ok(value) = serde_json::to_value(value) {
                entry.fields.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn error_info(self, error: &AppError) -> Self {
        if self.entry.is_none() {
            return self;
        }
        self.field("error", error.to_string())
            .field("error_category", error.category())
            .field("recoverable", error.is_recoverable())
    }

    pub async fn log(self) {
        if let Some(entry) = &self.entry {
            self.logger.write_entry(entry).await;
        }
    }
}

/// Logger for failed HTTP attempts inside the retry loops
#[derive(Debug, Clone)]
pub struct NetworkLogger {
    logger: Logger,
}

impl NetworkLogger {
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn quiet() -> Self {
        Self::from_logger(Logger::quiet("NET"))
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log one failed attempt that will be retried after `retry_in_ms`
    pub async fn log_retry(
        &self,
        level: LogLevel,
        method: &str,
        url: &str,
        attempt: u64,
        error: &AppError,
        retry_in_ms: u128,
    ) {
        if !self.logger.would_log(level) {
            return;
        }
        self.logger
            .log(level, &format!("{} {} failed (attempt {}): {}", method, url, attempt, error))
            .field("method", method)
            .field("url", url)
            .field("attempt", attempt)
            .field("retry_in_ms", retry_in_ms as u64)
            .error_info(error)
            .log()
            .await;
    }

    /// Log a request that went through after at least one retry
    pub async fn log_recovered(&self, method: &str, url: &str, attempts: u64) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }
        self.logger
            .debug(&format!("{} {} succeeded after {} attempts", method, url, attempts))
            .field("method", method)
            .field("url", url)
            .field("attempts", attempts)
            .log()
            .await;
    }
}

/// Logger for trial phases and per-trial timings
#[derive(Debug, Clone)]
pub struct TrialLogger {
    logger: Logger,
}

impl TrialLogger {
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn log_phase(&self, phase: &str, connection_count: usize) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }
        self.logger
            .debug(&format!("{} ({} sessions)", phase, connection_count))
            .field("phase", phase)
            .field("connection_count", connection_count)
            .log()
            .await;
    }

    pub async fn log_trial(&self, trial: &Trial) {
        if !self.logger.would_log(LogLevel::Info) {
            return;
        }
        self.logger
            .info(&format!(
                "Trial {} complete: {} sessions resolved in {:.3}ms",
                trial.index + 1,
                trial.connection_count,
                trial.latency_ms()
            ))
            .field("trial", trial.index + 1)
            .field("connection_count", trial.connection_count)
            .field("establish_ms", trial.establish_ms())
            .field("trigger_ms", trial.trigger_ms())
            .field("latency_ms", trial.latency_ms())
            .log()
            .await;
    }
}

/// Hands out loggers that share one run id
pub struct LoggerFactory {
    config: Config,
    run_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn create_logger(&self, name: &str) -> Logger {
        Logger::with_config(name, &self.config).with_run_id(&self.run_id)
    }

    pub fn create_network_logger(&self) -> NetworkLogger {
        NetworkLogger::from_logger(self.create_logger("NET"))
    }

    pub fn create_trial_logger(&self) -> TrialLogger {
        TrialLogger::from_logger(self.create_logger("TRIAL"))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}
