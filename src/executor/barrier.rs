//! Countdown barrier shared between the sessions of a trial and the orchestrator

use tokio::sync::watch;

/// Counts completions up to a fixed target and lets one waiter block until the
/// target is reached
///
/// Signals beyond the target are refused, so a session that misbehaves cannot
/// open the barrier for someone else.
#[derive(Debug)]
pub struct CompletionBarrier {
    target: usize,
    count: watch::Sender<usize>,
}

impl CompletionBarrier {
    pub fn new(target: usize) -> Self {
        let (count, _) = watch::channel(0);
        Self { target, count }
    }

    /// Record one completion; returns `false` if the barrier was already full
    pub fn signal(&self) -> bool {
        let target = self.target;
        self.count.send_if_modified(|count| {
            if *count < target {
                *count += 1;
                true
            } else {
                false
            }
        })
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_complete(&self) -> bool {
        self.count() >= self.target
    }

    /// Block until the count reaches the target; returns immediately for a target of zero
    pub async fn wait(&self) {
        if self.is_complete() {
            return;
        }
        let target = self.target;
        let mut receiver = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|count| *count >= target).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_target_is_already_open() {
        let barrier = CompletionBarrier::new(0);
        assert!(barrier.is_complete());
        barrier.wait().await;
        assert!(!barrier.signal());
        assert_eq!(barrier.count(), 0);
    }

    #[test]
    fn test_signals_beyond_target_are_refused() {
        let barrier = CompletionBarrier::new(2);
        assert!(barrier.signal());
        assert!(!barrier.is_complete());
        assert!(barrier.signal());
        assert!(barrier.is_complete());
        assert!(!barrier.signal());
        assert_eq!(barrier.count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_signals_open_the_barrier() {
        let barrier = Arc::new(CompletionBarrier::new(500));

        for _ in 0..500 {
            let barrier = barrier.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                barrier.signal();
            });
        }

        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier should open");
        assert_eq!(barrier.count(), 500);
    }

    #[tokio::test]
    async fn test_wait_blocks_until_last_signal() {
        let barrier = Arc::new(CompletionBarrier::new(2));
        barrier.signal();

        let pending = tokio::time::timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(pending.is_err());

        barrier.signal();
        tokio::time::timeout(Duration::from_millis(50), barrier.wait())
            .await
            .expect("barrier should be open");
    }

    #[test]
    fn test_waiter_is_woken_by_final_signal() {
        let barrier = CompletionBarrier::new(1);
        let mut wait = tokio_test::task::spawn(barrier.wait());

        tokio_test::assert_pending!(wait.poll());
        assert!(barrier.signal());
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }
}
