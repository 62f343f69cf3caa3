//! Data models and structures for the long-poll benchmark

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use metrics::{mean_duration, RandomKeyReport, Trial, TrialSummary, TrialTimer};
