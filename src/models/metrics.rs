//! Trial timing and result data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One full establish → trigger → resolve cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    /// Zero-based position within a repeated run
    pub index: u32,

    /// Sessions that took part
    pub connection_count: usize,

    /// Wall-clock time the sessions were spawned
    pub started_at: DateTime<Utc>,

    /// Spawn until the establishment barrier opened
    pub establish_duration: Duration,

    /// Round trip of the trigger PUT itself
    pub trigger_round_trip: Duration,

    /// Trigger start until the resolution barrier opened; the measured quantity
    pub latency: Duration,
}

impl Trial {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    pub fn establish_ms(&self) -> f64 {
        self.establish_duration.as_secs_f64() * 1000.0
    }

    pub fn trigger_ms(&self) -> f64 {
        self.trigger_round_trip.as_secs_f64() * 1000.0
    }
}

/// Records the instants of a trial as it progresses
#[derive(Debug)]
pub struct TrialTimer {
    index: u32,
    connection_count: usize,
    started_at: DateTime<Utc>,
    spawned: Instant,
    sessions_established: Option<Instant>,
    trigger_started: Option<Instant>,
    trigger_finished: Option<Instant>,
    all_resolved: Option<Instant>,
}

impl TrialTimer {
    /// Start timing at session spawn
    pub fn start(index: u32, connection_count: usize) -> Self {
        Self {
            index,
            connection_count,
            started_at: Utc::now(),
            spawned: Instant::now(),
            sessions_established: None,
            trigger_started: None,
            trigger_finished: None,
            all_resolved: None,
        }
    }

    pub fn sessions_established(&mut self) {
        self.sessions_established = Some(Instant::now());
    }

    /// Starts the measured interval
    pub fn trigger_started(&mut self) {
        self.trigger_started = Some(Instant::now());
    }

    pub fn trigger_finished(&mut self) {
        self.trigger_finished = Some(Instant::now());
    }

    /// Ends the measured interval
    pub fn all_resolved(&mut self) {
        self.all_resolved = Some(Instant::now());
    }

    /// Build the trial record; missing marks collapse to zero-length phases
    pub fn finish(self) -> Trial {
        let established = self.sessions_established.unwrap_or(self.spawned);
        let trigger_started = self.trigger_started.unwrap_or(established);
        let trigger_finished = self.trigger_finished.unwrap_or(trigger_started);
        let resolved = self.all_resolved.unwrap_or(trigger_finished);

        Trial {
            index: self.index,
            connection_count: self.connection_count,
            started_at: self.started_at,
            establish_duration: established.duration_since(self.spawned),
            trigger_round_trip: trigger_finished.duration_since(trigger_started),
            latency: resolved.duration_since(trigger_started),
        }
    }
}

/// Aggregate over repeated trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSummary {
    pub connection_count: usize,
    pub trials: Vec<Trial>,
    pub mean_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl TrialSummary {
    pub fn from_trials(connection_count: usize, trials: Vec<Trial>) -> Self {
        let latencies: Vec<Duration> = trials.iter().map(|t| t.latency).collect();

        Self {
            connection_count,
            mean_latency: mean_duration(&latencies),
            min_latency: latencies.iter().copied().min().unwrap_or(Duration::ZERO),
            max_latency: latencies.iter().copied().max().unwrap_or(Duration::ZERO),
            trials,
        }
    }

    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    pub fn mean_latency_ms(&self) -> f64 {
        self.mean_latency.as_secs_f64() * 1000.0
    }
}

/// Arithmetic mean of a set of durations, zero for an empty set
pub fn mean_duration(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::ZERO;
    }

    let total: u128 = durations.iter().map(|d| d.as_nanos()).sum();
    let mean = total / durations.len() as u128;
    Duration::from_nanos(mean.min(u64::MAX as u128) as u64)
}

/// Outcome of a random-key PUT run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomKeyReport {
    pub connection_count: usize,

    /// Full URLs of the generated keys
    pub keys: Vec<String>,

    /// Time spent spawning the PUT tasks
    pub dispatch: Duration,

    /// Time until every PUT finished, if the caller waited for them
    pub completion: Option<Duration>,
}
