//! Trial execution engine
//!
//! This module contains the measurement core:
//! - [`barrier`]: countdown barriers for "all established" and "all resolved"
//! - [`session`]: the long-poll session actor
//! - [`trigger`]: the single resolving write
//! - [`random_keys`]: the barrier-free write mode
//!
//! [`Orchestrator`] ties them together into trials.

pub mod barrier;
pub mod job;
pub mod random_keys;
pub mod session;
pub mod trigger;

pub use barrier::CompletionBarrier;
pub use job::TestJob;
pub use random_keys::{random_key_url, RandomKeyRun};
pub use session::{run_session, Session, SessionContext, SessionOutcome};
pub use trigger::issue_trigger;

use crate::client::{RetryPolicy, Transport};
use crate::error::{AppError, Result};
use crate::logging::{LogLevel, NetworkLogger, TrialLogger};
use crate::models::{Config, Trial, TrialSummary, TrialTimer};
use crate::output::progress::ReadinessNotifier;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// Parameters of a run, resolved from [`Config`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Watched key
    pub target: Url,
    /// Sessions per trial, or keys in random-key mode
    pub connection_count: usize,
    /// Payload of the trigger write
    pub trigger_value: String,
    /// Delay after a failed connect or PUT
    pub retry: RetryPolicy,
    /// Delay after a failed long-poll body read
    pub read_retry: RetryPolicy,
    /// Upper bound on each barrier wait; `None` waits forever
    pub timeout: Option<Duration>,
    pub repeat_count: u32,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            target: config.target()?,
            connection_count: config.connection_count,
            trigger_value: config.trigger_value.clone(),
            retry: RetryPolicy::fixed(config.retry_delay()),
            read_retry: RetryPolicy::fixed(config.read_retry_delay()),
            timeout: config.timeout(),
            repeat_count: config.repeat_count,
        })
    }
}

/// Runs trials against one key
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    options: RunOptions,
    network_logger: Arc<NetworkLogger>,
    trial_logger: TrialLogger,
    notifier: Option<ReadinessNotifier>,
}

impl Orchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        options: RunOptions,
        network_logger: Arc<NetworkLogger>,
        trial_logger: TrialLogger,
    ) -> Self {
        Self {
            transport,
            options,
            network_logger,
            trial_logger,
            notifier: None,
        }
    }

    /// Forward every session's readiness to a progress reporter
    pub fn with_notifier(mut self, notifier: ReadinessNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Measured latency of a single trial
    pub async fn run(&self) -> Result<Duration> {
        Ok(self.run_trial(0).await?.latency)
    }

    /// One establish → trigger → resolve cycle
    ///
    /// The clock starts immediately before the trigger write, so the result
    /// covers the write's own round trip plus propagation to every watcher.
    pub async fn run_trial(&self, index: u32) -> Result<Trial> {
        let count = self.options.connection_count;
        let job = Arc::new(TestJob::new(self.options.target.clone(), count));
        let context = Arc::new(SessionContext {
            job: job.clone(),
            transport: self.transport.clone(),
            retry: self.options.retry,
            read_retry: self.options.read_retry,
            logger: self.network_logger.clone(),
            notifier: self.notifier.clone(),
        });

        let mut timer = TrialTimer::start(index, count);
        self.trial_logger.log_phase("Spawning sessions", count).await;

        let mut sessions = JoinSet::new();
        for id in 0..count {
            sessions.spawn(run_session(id, context.clone()));
        }

        self.within_timeout("establishment barrier", job.wait_established(), &job, &mut sessions)
            .await?;
        timer.sessions_established();
        self.trial_logger.log_phase("All sessions established", count).await;

        timer.trigger_started();
        let trigger = issue_trigger(
            self.transport.as_ref(),
            job.target_url(),
            &self.options.trigger_value,
            self.options.retry,
            &self.network_logger,
        );
        self.within_timeout("trigger write", trigger, &job, &mut sessions)
            .await?;
        timer.trigger_finished();
        self.trial_logger.log_phase("Trigger accepted", count).await;

        self.within_timeout("resolution barrier", job.wait_resolved(), &job, &mut sessions)
            .await?;
        timer.all_resolved();

        let outcomes = drain_sessions(&mut sessions).await?;
        let reconnects: u64 = outcomes
            .iter()
            .map(|o| o.connect_attempts.saturating_sub(1))
            .sum();
        if reconnects > 0 && self.trial_logger.logger().would_log(LogLevel::Debug) {
            self.trial_logger
                .logger()
                .debug(&format!("{} reconnects during trial {}", reconnects, index + 1))
                .field("reconnects", reconnects)
                .log()
                .await;
        }

        let trial = timer.finish();
        self.trial_logger.log_trial(&trial).await;
        Ok(trial)
    }

    /// Repeat the full cycle `repeat_count` times and average the latencies
    pub async fn run_trials(&self) -> Result<TrialSummary> {
        let mut trials = Vec::with_capacity(self.options.repeat_count as usize);
        for index in 0..self.options.repeat_count {
            trials.push(self.run_trial(index).await?);
        }
        Ok(TrialSummary::from_trials(self.options.connection_count, trials))
    }

    /// Fire one PUT per random key under the target's directory, without barriers
    pub fn run_random_keys(&self) -> Result<RandomKeyRun> {
        random_keys::dispatch(
            self.transport.clone(),
            &self.options.target,
            self.options.connection_count,
            self.options.retry,
            self.network_logger.clone(),
        )
    }

    /// Run one phase of a trial under the optional run timeout
    ///
    /// On expiry every session is aborted and the error names the phase that
    /// did not finish.
    async fn within_timeout<F, T>(
        &self,
        phase: &str,
        future: F,
        job: &TestJob,
        sessions: &mut JoinSet<SessionOutcome>,
    ) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let Some(limit) = self.options.timeout else {
            return Ok(future.await);
        };

        if let Ok(output) = tokio::time::timeout(limit, future).await {
            return Ok(output);
        }

        sessions.abort_all();
        Err(AppError::timeout(format!(
            "{} not completed within {:?} ({}/{} established, {}/{} resolved)",
            phase,
            limit,
            job.established_count(),
            job.connection_count(),
            job.resolved_count(),
            job.connection_count()
        )))
    }
}

/// Collect finished sessions; a panicked session is an internal error
async fn drain_sessions(sessions: &mut JoinSet<SessionOutcome>) -> Result<Vec<SessionOutcome>> {
    let mut outcomes = Vec::with_capacity(sessions.len());
    while let Some(result) = sessions.join_next().await {
        let outcome = result.map_err(|e| AppError::internal(format!("Session task failed: {}", e)))?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
