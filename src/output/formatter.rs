//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides the
//! plain text and JSON implementations.

use crate::error::Result;
use crate::models::{RandomKeyReport, Trial, TrialSummary};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// The result line of a shared-key run
    fn format_trial_summary(&self, summary: &TrialSummary) -> Result<String>;

    /// The result line of a random-key run
    fn format_random_key_report(&self, report: &RandomKeyReport) -> Result<String>;

    /// Detail line for one trial, shown in verbose mode
    fn format_trial(&self, trial: &Trial) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone, Default)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Append trial details and extra timings
    pub verbose_mode: bool,
}

/// Render a duration the way Go's `time.Duration` prints: `0s`, `850ns`,
/// `1.5µs`, `12.345ms`, `1.234567891s`, `2m3.5s`, `1h0m0s`
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", decimal(nanos, 1_000_000, 6));
    }

    let total_secs = nanos / 1_000_000_000;
    let sub_nanos = nanos % 1_000_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = decimal((total_secs % 60) * 1_000_000_000 + sub_nanos, 1_000_000_000, 9);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h{}m", hours, minutes);
    } else if minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    let _ = write!(out, "{}s", seconds);
    out
}

/// `value / unit` with the fraction printed to `digits` places, trailing zeros trimmed
fn decimal(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = digits);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// `complete <N> connections in <duration>`
pub fn format_result_line(connection_count: usize, duration: Duration) -> String {
    format!("complete {} connections in {}", connection_count, format_duration(duration))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_trial_summary(&self, summary: &TrialSummary) -> Result<String> {
        let mut output = format_result_line(summary.connection_count, summary.mean_latency);
        if summary.trial_count() > 1 {
            let _ = write!(
                output,
                " (mean of {} trials, min {}, max {})",
                summary.trial_count(),
                format_duration(summary.min_latency),
                format_duration(summary.max_latency)
            );
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
        let mut output = format_result_line(report.connection_count, report.dispatch);
        if self.options.verbose_mode {
            if let Some(completion) = report.completion {
                let _ = write!(
                    output,
                    "\nall {} writes acknowledged in {}",
                    report.connection_count,
                    format_duration(completion)
                );
            }
        }
        Ok(output)
    }

    fn format_trial(&self, trial: &Trial) -> Result<String> {
        Ok(format!(
            "  trial {}: established in {}, trigger {}, resolved in {}",
            trial.index + 1,
            format_duration(trial.establish_duration),
            format_duration(trial.trigger_round_trip),
            format_duration(trial.latency)
        ))
    }
}

/// Machine-readable summary, one JSON document per run
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonTrial {
    trial: u32,
    started_at: String,
    establish_ms: f64,
    trigger_ms: f64,
    latency_ms: f64,
}

#[derive(Serialize)]
struct JsonTrialSummary<'a> {
    mode: &'a str,
    connection_count: usize,
    trials: Vec<JsonTrial>,
    mean_latency_ms: f64,
    min_latency_ms: f64,
    max_latency_ms: f64,
    result: String,
}

#[derive(Serialize)]
struct JsonRandomKeyReport<'a> {
    mode: &'a str,
    connection_count: usize,
    dispatch_ms: f64,
    completion_ms: Option<f64>,
    keys: &'a [String],
    result: String,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl OutputFormatter for JsonFormatter {
    fn format_trial_summary(&self, summary: &TrialSummary) -> Result<String> {
        let document = JsonTrialSummary {
            mode: "shared-key-wait",
            connection_count: summary.connection_count,
            trials: summary
                .trials
                .iter()
                .map(|t| JsonTrial {
                    trial: t.index + 1,
                    started_at: t.started_at.to_rfc3339(),
                    establish_ms: t.establish_ms(),
                    trigger_ms: t.trigger_ms(),
                    latency_ms: t.latency_ms(),
                })
                .collect(),
            mean_latency_ms: millis(summary.mean_latency),
            min_latency_ms: millis(summary.min_latency),
            max_latency_ms: millis(summary.max_latency),
            result: format_result_line(summary.connection_count, summary.mean_latency),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn format_random_key_report(&self, report: &RandomKeyReport) -> Result<String> {
        let document = JsonRandomKeyReport {
            mode: "random-key-put",
            connection_count: report.connection_count,
            dispatch_ms: millis(report.dispatch),
            completion_ms: report.completion.map(millis),
            keys: &report.keys,
            result: format_result_line(report.connection_count, report.dispatch),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn format_trial(&self, trial: &Trial) -> Result<String> {
        Ok(serde_json::to_string(trial)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn trial(index: u32, latency_ms: u64) -> Trial {
        Trial {
            index,
            connection_count: 50,
            started_at: Utc::now(),
            establish_duration: Duration::from_millis(30),
            trigger_round_trip: Duration::from_millis(2),
            latency: Duration::from_millis(latency_ms),
        }
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(850)), "850ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_micros(1_500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_millis(200)), "200ms");
        assert_eq!(format_duration(Duration::from_nanos(12_345_678)), "12.345678ms");
        assert_eq!(format_duration(Duration::from_nanos(1_234_567_891)), "1.234567891s");
        assert_eq!(format_duration(Duration::from_secs(2)), "2s");
        assert_eq!(format_duration(Duration::from_millis(123_500)), "2m3.5s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
    }

    #[test]
    fn test_result_line() {
        assert_eq!(
            format_result_line(2000, Duration::from_millis(1500)),
            "complete 2000 connections in 1.5s"
        );
    }

    #[test]
    fn test_plain_summary_single_and_repeated() {
        let formatter = PlainFormatter::new(FormattingOptions::default());

        let single = TrialSummary::from_trials(50, vec![trial(0, 200)]);
        assert_eq!(
            formatter.format_trial_summary(&single).unwrap(),
            "complete 50 connections in 200ms"
        );

        let repeated = TrialSummary::from_trials(50, vec![trial(0, 100), trial(1, 200), trial(2, 300)]);
        assert_eq!(
            formatter.format_trial_summary(&repeated).unwrap(),
            "complete 50 connections in 200ms (mean of 3 trials, min 100ms, max 300ms)"
        );
    }

    #[test]
    fn test_verbose_summary_lists_trials() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
        });
        let summary = TrialSummary::from_trials(50, vec![trial(0, 100), trial(1, 300)]);
        let output = formatter.format_trial_summary(&summary).unwrap();
        assert_eq!(output.lines().count(), 3);
        assert!(output.contains("trial 2: established in 30ms, trigger 2ms, resolved in 300ms"));
    }

    #[test]
    fn test_random_key_report() {
        let formatter = PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: true,
        });
        let report = RandomKeyReport {
            connection_count: 5,
            keys: vec![],
            dispatch: Duration::from_micros(250),
            completion: Some(Duration::from_millis(40)),
        };
        assert_eq!(
            formatter.format_random_key_report(&report).unwrap(),
            "complete 5 connections in 250µs\nall 5 writes acknowledged in 40ms"
        );
    }

    #[test]
    fn test_json_summary_is_valid() {
        let summary = TrialSummary::from_trials(50, vec![trial(0, 100), trial(1, 300)]);
        let output = JsonFormatter.format_trial_summary(&summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["connection_count"], 50);
        assert_eq!(value["mean_latency_ms"], 200.0);
        assert_eq!(value["trials"].as_array().unwrap().len(), 2);
        assert_eq!(value["result"], "complete 50 connections in 200ms");
    }

    proptest! {
        #[test]
        fn prop_format_duration_is_well_formed(nanos in 0u64..10_000_000_000_000) {
            let text = format_duration(Duration::from_nanos(nanos));
            prop_assert!(text.ends_with('s'));
            prop_assert!(!text.contains(".s"));
            if text.contains('.') {
                let number = text.trim_end_matches(|c: char| c.is_alphabetic() || c == 'µ');
                prop_assert!(!number.ends_with('0'));
            }
        }
    }
}
