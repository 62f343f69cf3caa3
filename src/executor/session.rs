//! One simulated client holding one long-poll watch

use super::job::TestJob;
use crate::client::{HttpRequest, RetryPolicy, Transport};
use crate::logging::{LogLevel, NetworkLogger};
use crate::output::progress::ReadinessNotifier;
use crate::types::SessionState;
use std::sync::Arc;

/// Everything a session needs, shared by all sessions of a trial
pub struct SessionContext {
    pub job: Arc<TestJob>,
    pub transport: Arc<dyn Transport>,
    /// Delay after a failed connect
    pub retry: RetryPolicy,
    /// Delay after a failed body read before the watch is re-issued
    pub read_retry: RetryPolicy,
    pub logger: Arc<NetworkLogger>,
    pub notifier: Option<ReadinessNotifier>,
}

/// Attempt counters of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub id: usize,
    pub connect_attempts: u64,
    pub read_attempts: u64,
}

/// A long-poll session
///
/// The session runs its own request loop instead of the shared retry helper
/// because readiness has to be signaled the instant response headers arrive,
/// before the body read blocks.
#[derive(Debug)]
pub struct Session {
    id: usize,
    state: SessionState,
    established_signaled: bool,
    connect_attempts: u64,
    read_attempts: u64,
}

impl Session {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: SessionState::Connecting,
            established_signaled: false,
            connect_attempts: 0,
            read_attempts: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {} -> {}",
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
    }

    /// Signal readiness; a reconnect after a failed read does not signal again
    fn mark_established(&mut self, context: &SessionContext) {
        if self.established_signaled {
            return;
        }
        self.established_signaled = true;
        context.job.signal_established();
        if let Some(notifier) = &context.notifier {
            notifier.notify();
        }
    }

    /// Drive the session until its watch has resolved
    pub async fn run(mut self, context: &SessionContext) -> SessionOutcome {
        let request = HttpRequest::long_poll(context.job.target_url());
        let url = request.url.to_string();

        loop {
            self.connect_attempts += 1;
            let mut response = match context.transport.send(&request).await {
                Ok(response) => response,
                Err(error) => {
                    self.transition(SessionState::RetryingConnect);
                    context
                        .logger
                        .log_retry(
                            LogLevel::Debug,
                            "GET",
                            &url,
                            self.connect_attempts,
                            &error,
                            context.retry.delay.as_millis(),
                        )
                        .await;
                    tokio::time::sleep(context.retry.delay).await;
                    self.transition(SessionState::Connecting);
                    continue;
                }
            };

            self.transition(SessionState::Established);
            self.mark_established(context);

            self.transition(SessionState::WaitingForResolution);
            self.read_attempts += 1;
            match response.read_to_end().await {
                Ok(_) => {
                    self.transition(SessionState::Resolved);
                    context.job.signal_resolved();
                    return SessionOutcome {
                        id: self.id,
                        connect_attempts: self.connect_attempts,
                        read_attempts: self.read_attempts,
                    };
                }
                Err(error) => {
                    self.transition(SessionState::RetryingRead);
                    context
                        .logger
                        .log_retry(
                            LogLevel::Debug,
                            "GET",
                            &url,
                            self.read_attempts,
                            &error,
                            context.read_retry.delay.as_millis(),
                        )
                        .await;
                    tokio::time::sleep(context.read_retry.delay).await;
                    self.transition(SessionState::Connecting);
                }
            }
        }
    }
}

/// Spawn-friendly entry point
pub async fn run_session(id: usize, context: Arc<SessionContext>) -> SessionOutcome {
    Session::new(id).run(&context).await
}
