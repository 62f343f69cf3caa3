//! Error handling for the long-poll benchmark
//!
//! The measurement core only ever sees two failure kinds, [`AppError::Transport`]
//! and [`AppError::BodyRead`], and both are absorbed by the retry loops. The
//! remaining variants cover configuration, the optional barrier timeout and
//! process-level concerns of the binary.

use thiserror::Error;

/// Custom error types for the long-poll benchmark
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection refused, DNS failure, TLS failure or send failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response stream closed or truncated while reading the body
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// A barrier wait exceeded the configured run timeout
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Run interrupted by the operator
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new body read error
    pub fn body_read<S: Into<String>>(message: S) -> Self {
        Self::BodyRead(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new cancellation error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Transport(_) => "TRANSPORT",
            Self::BodyRead(_) => "BODY_READ",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Cancelled(_) => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the retry loops treat this error as transient
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::BodyRead(_))
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Transport(_) | Self::BodyRead(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::Cancelled(_) => 130,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if !use_color {
            return format!("[{}] {}", category, message);
        }

        use colored::Colorize;
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                format!("[{}] {}", category.red().bold(), message.red())
            }
            Self::Transport(_) | Self::BodyRead(_) => {
                format!("[{}] {}", category.yellow().bold(), message.yellow())
            }
            Self::Timeout(_) | Self::Cancelled(_) => {
                format!("[{}] {}", category.blue().bold(), message.blue())
            }
            Self::Io(_) => format!("[{}] {}", category.cyan().bold(), message.cyan()),
            Self::Internal(_) => {
                format!("[{}] {}", category.bright_red().bold(), message.bright_red())
            }
        }
    }

    /// Short troubleshooting hints printed by the binary after a failure
    pub fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => &[
                "Check your .env file format",
                "The target URL must start with http:// or https://",
                "Run with --help to see accepted flags",
            ],
            Self::Timeout(_) => &[
                "Some sessions never observed the trigger write",
                "Check that the target key endpoint supports ?wait=true",
                "Raise --timeout or drop it to wait indefinitely",
            ],
            Self::Io(_) => &["Check file permissions and the open file descriptor limit (ulimit -n)"],
            _ => &[],
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_body() || error.is_decode() {
            Self::body_read(error.to_string())
        } else {
            Self::transport(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error and its suggestions
    pub fn render(&self, error: &AppError) -> String {
        let mut output = error.format_for_console(self.use_color);

        let suggestions = error.suggestions();
        if self.verbose && !suggestions.is_empty() {
            output.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                output.push_str(&format!("\n  - {}", suggestion));
            }
        }

        output
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}
