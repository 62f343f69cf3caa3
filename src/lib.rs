//! Long-Poll Bench
//!
//! A load-generation harness that opens a large number of concurrent long-poll
//! watches on one key of an etcd-style key-value store, waits until every watch
//! is established, issues a single write, and measures how long it takes until
//! every watcher has observed the response.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{Orchestrator, RunOptions};
pub use models::{Config, Trial, TrialSummary};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TARGET_URL: &str = "http://127.0.0.1:2379/v2/keys/name";
    pub const DEFAULT_CONNECTION_COUNT: usize = 2000;
    pub const DEFAULT_REPEAT_COUNT: u32 = 1;
    pub const DEFAULT_TRIGGER_VALUE: &str = "jex";
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_REPORT_EVERY: usize = 1000;
    pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_PROGRESS_BUFFER: usize = 1024;
    pub const DEFAULT_MILESTONES: &[usize] = &[
        1000, 2000, 4000, 8000, 16000, 20000, 32000, 40000, 45000, 50000, 55000, 60000, 64000,
    ];
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
