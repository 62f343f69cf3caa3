//! Coordination state of one trial

use super::barrier::CompletionBarrier;
use url::Url;

/// Target, size and the two completion barriers of one trial
///
/// Sessions hold it through an `Arc` and may only call the two `signal_*`
/// methods; the orchestrator is the only waiter.
#[derive(Debug)]
pub struct TestJob {
    target_url: Url,
    connection_count: usize,
    established: CompletionBarrier,
    resolved: CompletionBarrier,
}

impl TestJob {
    pub fn new(target_url: Url, connection_count: usize) -> Self {
        Self {
            target_url,
            connection_count,
            established: CompletionBarrier::new(connection_count),
            resolved: CompletionBarrier::new(connection_count),
        }
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    /// A session received its response headers
    pub fn signal_established(&self) -> bool {
        self.established.signal()
    }

    /// A session finished reading its response body
    pub fn signal_resolved(&self) -> bool {
        self.resolved.signal()
    }

    pub fn established_count(&self) -> usize {
        self.established.count()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.count()
    }

    pub async fn wait_established(&self) {
        self.established.wait().await
    }

    pub async fn wait_resolved(&self) {
        self.resolved.wait().await
    }
}
