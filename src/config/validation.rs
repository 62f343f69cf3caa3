//! Configuration validation utilities and rules
//!
//! [`Config::validate`] rejects settings the run cannot work with; the checks
//! here only produce warnings about settings that will run but may skew or
//! starve the measurement.

use crate::{
    error::Result,
    models::Config,
    types::TestMode,
};
use colored::Colorize;

/// Descriptors the process needs beyond one per session (stdio, resolver, trigger)
const DESCRIPTOR_HEADROOM: u64 = 32;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_target_url(config)?);
        warnings.extend(Self::validate_retry_settings(config));
        warnings.extend(Self::validate_mode_settings(config));
        warnings.extend(Self::validate_resource_limits(
            config.connection_count,
            open_file_limit(),
            ephemeral_port_count(),
        ));

        Ok(warnings)
    }

    fn validate_target_url(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let url = config.target()?;

        if !url.path().contains("/v2/keys/") {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "URL '{}' does not look like a v2 keys endpoint; long-polls may return immediately",
                    url
                ),
            ));
        }

        if url.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("URL '{}' has a query string; wait=true is appended to it", url),
            ));
        }

        if url.scheme() == "https" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "HTTPS target: TLS handshakes add to the time until all sessions are established".to_string(),
            ));
        }

        Ok(warnings)
    }

    fn validate_retry_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.retry_delay_ms == 0 || config.read_retry_delay_ms == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "A retry delay of 0ms makes failing sessions reconnect in a tight loop".to_string(),
            ));
        }

        if config.read_retry_delay_ms >= 1000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Each failed long-poll read after the trigger adds at least {}ms to the result",
                    config.read_retry_delay_ms
                ),
            ));
        }

        warnings
    }

    fn validate_mode_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.test_mode == TestMode::RandomKeyPut && config.repeat_count > 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Repeat count is ignored in random-key mode".to_string(),
            ));
        }

        if config.test_mode == TestMode::SharedKeyWait && config.connection_count == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "No sessions requested; only the trigger write is timed".to_string(),
            ));
        }

        warnings
    }

    /// Compare the session count against descriptor and ephemeral port limits
    fn validate_resource_limits(
        connection_count: usize,
        open_files: Option<u64>,
        ephemeral_ports: Option<u64>,
    ) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let needed = connection_count as u64;

        if let Some(limit) = open_files {
            if needed + DESCRIPTOR_HEADROOM > limit {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "{} sessions need about {} file descriptors but the limit is {}; raise it with ulimit -n",
                        connection_count,
                        needed + DESCRIPTOR_HEADROOM,
                        limit
                    ),
                ));
            }
        }

        if let Some(ports) = ephemeral_ports {
            if needed > ports {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "{} sessions exceed the {} local ports available towards one server address",
                        connection_count, ports
                    ),
                ));
            }
        }

        warnings
    }
}

/// Soft limit on open files, where the platform exposes it
fn open_file_limit() -> Option<u64> {
    let limits = std::fs::read_to_string("/proc/self/limits").ok()?;
    parse_open_file_limit(&limits)
}

fn parse_open_file_limit(limits: &str) -> Option<u64> {
    let line = limits.lines().find(|line| line.starts_with("Max open files"))?;
    let soft = line.trim_start_matches("Max open files").split_whitespace().next()?;
    soft.parse().ok()
}

/// Size of the local port range used for outgoing connections
fn ephemeral_port_count() -> Option<u64> {
    let range = std::fs::read_to_string("/proc/sys/net/ipv4/ip_local_port_range").ok()?;
    parse_port_range(&range)
}

fn parse_port_range(range: &str) -> Option<u64> {
    let mut bounds = range.split_whitespace().map(|v| v.parse::<u64>());
    let low = bounds.next()?.ok()?;
    let high = bounds.next()?.ok()?;
    high.checked_sub(low).map(|span| span + 1)
}

/// Severity of a validation warning; hard errors are `AppError`s from `Config::validate`
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }

        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
        };
        format!("{} {}", tag.bold(), self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
