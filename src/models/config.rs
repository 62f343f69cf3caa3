//! Configuration data model and validation

use crate::types::{AppError, Result, TestMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Key endpoint every session watches
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Number of concurrent sessions (or random keys in mode 2)
    #[serde(default = "default_connection_count")]
    pub connection_count: usize,

    /// Load pattern to run
    #[serde(default)]
    pub test_mode: TestMode,

    /// Number of trials averaged in shared-key mode
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,

    /// Value written by the trigger PUT
    #[serde(default = "default_trigger_value")]
    pub trigger_value: String,

    /// Backoff after a failed connect or PUT
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Backoff after a failed long-poll body read
    #[serde(default = "default_retry_delay_ms")]
    pub read_retry_delay_ms: u64,

    /// Optional bound on each barrier wait; `None` waits forever
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Emit a progress line every this many established sessions (0 disables)
    #[serde(default = "default_report_every")]
    pub report_every: usize,

    /// Additional established-session counts that always emit a progress line
    #[serde(default = "default_milestones")]
    pub milestones: Vec<usize>,

    /// Heartbeat interval of the progress reporter
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,

    /// Run the progress reporter at all
    #[serde(default = "default_progress")]
    pub progress: bool,

    /// Capacity of the readiness notification channel
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print a JSON summary instead of the plain result line
    #[serde(default)]
    pub json: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            connection_count: default_connection_count(),
            test_mode: TestMode::default(),
            repeat_count: default_repeat_count(),
            trigger_value: default_trigger_value(),
            retry_delay_ms: default_retry_delay_ms(),
            read_retry_delay_ms: default_retry_delay_ms(),
            timeout_seconds: None,
            report_every: default_report_every(),
            milestones: default_milestones(),
            report_interval_ms: default_report_interval_ms(),
            progress: default_progress(),
            progress_buffer: default_progress_buffer(),
            enable_color: default_enable_color(),
            json: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed target URL
    pub fn target(&self) -> Result<url::Url> {
        url::Url::parse(&self.target_url)
            .map_err(|e| AppError::config(format!("Invalid target URL '{}': {}", self.target_url, e)))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Barrier timeout, if one was configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            return Err(AppError::config("Target URL cannot be empty"));
        }

        let parsed = self.target()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AppError::config(format!(
                "Target URL must use http or https: {}",
                self.target_url
            )));
        }
        if parsed.host_str().is_none() {
            return Err(AppError::config(format!("Target URL has no host: {}", self.target_url)));
        }

        if self.repeat_count == 0 {
            return Err(AppError::config("Repeat count must be greater than 0"));
        }

        if self.trigger_value.is_empty() {
            return Err(AppError::config("Trigger value cannot be empty"));
        }

        if self.timeout_seconds == Some(0) {
            return Err(AppError::config("Timeout must be greater than 0 when set"));
        }

        if self.report_interval_ms == 0 {
            return Err(AppError::config("Report interval must be greater than 0"));
        }

        if self.progress_buffer == 0 {
            return Err(AppError::config("Progress buffer must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(target_url) = std::env::var("TARGET_URL") {
            let target_url = target_url.trim();
            if !target_url.is_empty() {
                self.target_url = target_url.to_string();
            }
        }

        if let Ok(count) = std::env::var("CONNECTION_COUNT") {
            self.connection_count = count
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid CONNECTION_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(mode) = std::env::var("TEST_MODE") {
            self.test_mode = mode
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TEST_MODE value '{}': {}", mode, e)))?;
        }

        if let Ok(repeat) = std::env::var("REPEAT_COUNT") {
            self.repeat_count = repeat
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid REPEAT_COUNT value '{}': {}", repeat, e)))?;
        }

        if let Ok(value) = std::env::var("TRIGGER_VALUE") {
            self.trigger_value = value;
        }

        if let Ok(delay) = std::env::var("RETRY_DELAY_MS") {
            self.retry_delay_ms = delay
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid RETRY_DELAY_MS value '{}': {}", delay, e)))?;
        }

        if let Ok(delay) = std::env::var("READ_RETRY_DELAY_MS") {
            self.read_retry_delay_ms = delay.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid READ_RETRY_DELAY_MS value '{}': {}", delay, e))
            })?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT_SECONDS") {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
            self.timeout_seconds = Some(secs);
        }

        if let Ok(every) = std::env::var("REPORT_EVERY") {
            self.report_every = every
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid REPORT_EVERY value '{}': {}", every, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color
                .trim()
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_target_url() -> String {
    crate::defaults::DEFAULT_TARGET_URL.to_string()
}

fn default_connection_count() -> usize {
    crate::defaults::DEFAULT_CONNECTION_COUNT
}

fn default_repeat_count() -> u32 {
    crate::defaults::DEFAULT_REPEAT_COUNT
}

fn default_trigger_value() -> String {
    crate::defaults::DEFAULT_TRIGGER_VALUE.to_string()
}

fn default_retry_delay_ms() -> u64 {
    crate::defaults::DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_report_every() -> usize {
    crate::defaults::DEFAULT_REPORT_EVERY
}

fn default_milestones() -> Vec<usize> {
    crate::defaults::DEFAULT_MILESTONES.to_vec()
}

fn default_report_interval_ms() -> u64 {
    crate::defaults::DEFAULT_REPORT_INTERVAL.as_millis() as u64
}

fn default_progress() -> bool {
    true
}

fn default_progress_buffer() -> usize {
    crate::defaults::DEFAULT_PROGRESS_BUFFER
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
