//! Colored formatter implementation with terminal color support

use super::formatter::{format_duration, FormattingOptions, OutputFormatter, PlainFormatter};
use crate::error::Result;
use crate::models::{RandomKeyReport, Trial, TrialSummary};
use colored::*;
use std::time::Duration;

/// Latency band used to pick a color
#[derive(Debug, Clone, PartialEq)]
pub enum LatencyLevel {
    Fast,     // < 100ms
    Moderate, // 100ms-1s
    Slow,     // >= 1s, at least one retry delay landed in the measurement
}

impl LatencyLevel {
    pub fn from_duration(duration: Duration) -> Self {
        if duration < Duration::from_millis(100) {
            Self::Fast
        } else if duration < Duration::from_secs(1) {
            Self::Moderate
        } else {
            Self::Slow
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Fast => Color::Green,
            Self::Moderate => Color::Yellow,
            Self::Slow => Color::Red,
        }
    }
}

/// Colored terminal output; layout identical to [`PlainFormatter`]
pub struct ColoredFormatter {
    options: FormattingOptions,
    plain: PlainFormatter,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            plain: PlainFormatter::new(options.clone()),
            options,
        }
    }

    fn paint(&self, duration: Duration) -> ColoredString {
        format_duration(duration)
            .color(LatencyLevel::from_duration(duration).color())
            .bold()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_trial_summary(&self, summary: &TrialSummary) -> Result<String> {
        let mut output = format!(
            "{} {} connections in {}",
            "complete".green().bold(),
            summary.connection_count,
            self.paint(summary.mean_latency)
        );
        if summary.trial_count() > 1 {
            output.push_str(&format!(
                " (mean of {} trials, min {}, max {})",
                summary.trial_count(),
                self.paint(summary.min_latency),
                self.paint(summary.max_latency)
            ));
        }
        if self.options.verbose_mode {
            for trial in &summary.trials {
                output.push('\n');
                output.push_str(&self.format_trial(trial)?);
            }
        }
        Ok(output)
    }

    fn format_random_key_report(&self, report: &RandomKeyReport) -> Result<String> {
        let mut output = format!(
            "{} {} connections in {}",
            "complete".green().bold(),
            report.connection_count,
            self.paint(report.dispatch)
        );
        if self.options.verbose_mode {
            if let Some(completion) = report.completion {
                output.push_str(&format!(
                    "\nall {} writes acknowledged in {}",
                    report.connection_count,
                    self.paint(completion)
                ));
            }
        }
        Ok(output)
    }

    fn format_trial(&self, trial: &Trial) -> Result<String> {
        Ok(self.plain.format_trial(trial)?.dimmed().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_levels() {
        assert_eq!(LatencyLevel::from_duration(Duration::from_millis(5)), LatencyLevel::Fast);
        assert_eq!(LatencyLevel::from_duration(Duration::from_millis(500)), LatencyLevel::Moderate);
        assert_eq!(LatencyLevel::from_duration(Duration::from_millis(1200)), LatencyLevel::Slow);
        assert_eq!(LatencyLevel::Slow.color(), Color::Red);
    }

    #[test]
    fn test_colored_summary_keeps_plain_text() {
        colored::control::set_override(false);
        let formatter = ColoredFormatter::new(FormattingOptions {
            enable_color: true,
            verbose_mode: false,
        });
        let summary = TrialSummary::from_trials(0, vec![]);
        let output = formatter.format_trial_summary(&summary).unwrap();
        assert_eq!(output, "complete 0 connections in 0s");
    }
}
