//! Output formatting and display system
//!
//! Result lines go to stdout in plain, colored or JSON form; progress lines
//! come from [`progress`].

mod colored;
mod formatter;
pub mod progress;

pub use self::colored::{ColoredFormatter, LatencyLevel};
pub use formatter::{
    format_duration, format_result_line, FormattingOptions, JsonFormatter, OutputFormatter,
    PlainFormatter,
};
pub use progress::{
    ProgressReporter, ProgressSettings, ProgressSink, ProgressSnapshot, ProgressStats,
    ReadinessNotifier, StdoutSink,
};

use crate::error::Result;
use crate::models::{Config, RandomKeyReport, TrialSummary};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, json: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        if json {
            return Box::new(JsonFormatter);
        }

        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.enable_color, config.json, config.verbose)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(OutputFormatterFactory::from_config(config))
    }

    pub fn display_trial_summary(&self, summary: &TrialSummary) -> Result<String> {
        self.formatter.format_trial_summary(summary)
    }

    pub fn display_random_key_report(&self, report: &RandomKeyReport) -> Result<String> {
        self.formatter.format_random_key_report(report)
    }
}
