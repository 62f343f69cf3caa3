//! Command-line interface module

use clap::Parser;

/// Long-poll bench: measure how long a single write takes to reach thousands of watchers
///
/// Settings left unset on the command line fall back to environment
/// variables, then to a `.env` file, then to built-in defaults.
#[derive(Parser, Debug, Clone)]
#[command(name = "lpb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Concurrent long-poll sessions, or keys written in random-key mode [default: 2000]
    #[arg(short = 'c', long = "connections", value_name = "N")]
    pub connections: Option<usize>,

    /// Watched key URL [default: http://127.0.0.1:2379/v2/keys/name]
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// 1: wait on the same key, 2: put random keys [default: 1]
    #[arg(short = 't', long = "test-type", value_name = "TYPE", value_parser = clap::value_parser!(u8).range(1..=2))]
    pub test_type: Option<u8>,

    /// Trials to run and average [default: 1]
    #[arg(short = 'r', long = "repeat", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: Option<u32>,

    /// Payload of the trigger write [default: jex]
    #[arg(long, value_name = "VALUE")]
    pub value: Option<String>,

    /// Delay after a failed connect or PUT, in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Delay after a failed long-poll body read, in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub read_retry_delay_ms: Option<u64>,

    /// Give up when sessions do not establish or resolve within this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Print a progress line every N established sessions, 0 to disable [default: 1000]
    #[arg(long, value_name = "N")]
    pub report_every: Option<usize>,

    /// Do not print progress lines
    #[arg(long)]
    pub no_progress: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.url {
            if url.trim().is_empty() {
                return Err("--url must not be empty".to_string());
            }
        }

        if let Some(ref value) = self.value {
            if value.is_empty() {
                return Err("--value must not be empty".to_string());
            }
        }

        if self.json && self.verbose {
            return Err("Cannot combine --json with --verbose".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse a timeout in whole seconds
fn parse_timeout(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Timeout must be greater than 0".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
