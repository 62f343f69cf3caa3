//! Best-effort progress reporting while sessions establish
//!
//! Sessions push readiness events through a bounded channel with `try_send`;
//! when the reporter falls behind, events are dropped and counted instead of
//! stalling the session.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// One session received its response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessEvent;

/// Sending half handed to every session
#[derive(Debug, Clone)]
pub struct ReadinessNotifier {
    sender: mpsc::Sender<ReadinessEvent>,
    dropped: Arc<AtomicU64>,
}

impl ReadinessNotifier {
    /// Bounded channel of `capacity` events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReadinessEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// Never waits; returns `false` if the event was dropped
    pub fn notify(&self) -> bool {
        match self.sender.try_send(ReadinessEvent) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Events lost because the channel was full or the reporter had stopped
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// When the reporter prints
#[derive(Debug, Clone)]
pub struct ProgressSettings {
    /// Print whenever the tally is a multiple of this; 0 disables it
    pub report_every: usize,
    /// Additional tallies that always print
    pub milestones: Vec<usize>,
    /// Heartbeat period
    pub interval: Duration,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            report_every: crate::defaults::DEFAULT_REPORT_EVERY,
            milestones: crate::defaults::DEFAULT_MILESTONES.to_vec(),
            interval: crate::defaults::DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl ProgressSettings {
    pub fn from_config(config: &crate::models::Config) -> Self {
        Self {
            report_every: config.report_every,
            milestones: config.milestones.clone(),
            interval: config.report_interval(),
        }
    }

    pub fn is_milestone(&self, tally: usize) -> bool {
        (self.report_every > 0 && tally % self.report_every == 0) || self.milestones.contains(&tally)
    }
}

/// A single progress line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub unix_time: i64,
    pub tally: usize,
    pub live_tasks: usize,
    pub memory_mb: f64,
}

impl ProgressSnapshot {
    pub fn capture(tally: usize) -> Self {
        Self {
            unix_time: Utc::now().timestamp(),
            tally,
            live_tasks: live_tasks(),
            memory_mb: resident_memory_mb(),
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{:.2} mb",
            self.unix_time, self.tally, self.live_tasks, self.memory_mb
        )
    }
}

/// Destination of progress lines
pub trait ProgressSink: Send {
    fn emit(&mut self, snapshot: &ProgressSnapshot);
}

/// Prints each line to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&mut self, snapshot: &ProgressSnapshot) {
        println!("{}", snapshot);
    }
}

/// Totals after the reporter stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStats {
    pub tally: usize,
    pub lines: usize,
}

/// Background consumer of readiness events
pub struct ProgressReporter<S: ProgressSink> {
    settings: ProgressSettings,
    receiver: mpsc::Receiver<ReadinessEvent>,
    sink: S,
}

impl<S: ProgressSink> ProgressReporter<S> {
    pub fn new(settings: ProgressSettings, receiver: mpsc::Receiver<ReadinessEvent>, sink: S) -> Self {
        Self {
            settings,
            receiver,
            sink,
        }
    }

    /// Run until every notifier has been dropped
    pub async fn run(mut self) -> ProgressStats {
        let mut stats = ProgressStats { tally: 0, lines: 0 };
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut printed_this_interval = false;
        loop {
            tokio::select! {
                event = self.receiver.recv() => {
                    if event.is_none() {
                        break;
                    }
                    stats.tally += 1;
                    if self.settings.is_milestone(stats.tally) {
                        self.sink.emit(&ProgressSnapshot::capture(stats.tally));
                        stats.lines += 1;
                        printed_this_interval = true;
                    }
                }
                _ = ticker.tick() => {
                    if !printed_this_interval {
                        self.sink.emit(&ProgressSnapshot::capture(stats.tally));
                        stats.lines += 1;
                    }
                    printed_this_interval = false;
                }
            }
        }

        stats
    }
}

/// Tasks currently alive on the tokio runtime, 0 outside a runtime
pub fn live_tasks() -> usize {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks())
        .unwrap_or(0)
}

/// Resident set size of this process in MiB, 0 where it cannot be read
pub fn resident_memory_mb() -> f64 {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_vm_rss_kb(&status))
            .map(|kb| kb as f64 / 1024.0)
            .unwrap_or(0.0)
    }

    #[cfg(not(target_os = "linux"))]
    {
        0.0
    }
}

fn parse_vm_rss_kb(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}
