//! Write-throughput mode: one PUT per freshly generated key, no barriers

use crate::client::{perform, HttpRequest, RetryPolicy, Transport};
use crate::error::{AppError, Result};
use crate::logging::{LogLevel, NetworkLogger};
use crate::models::RandomKeyReport;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use url::Url;
use uuid::Uuid;

/// Replace the last path segment of `base` with `key`
///
/// `http://host/v2/keys/name` becomes `http://host/v2/keys/<key>`; a base
/// ending in `/` is treated as the key directory itself.
pub fn random_key_url(base: &Url, key: &str) -> Result<Url> {
    let is_directory = base.path().ends_with('/');
    let mut url = base.clone();
    url.set_query(None);
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AppError::validation(format!("URL cannot hold a key path: {}", base)))?;
        if is_directory {
            segments.pop_if_empty();
        } else {
            segments.pop();
        }
        segments.push(key);
    }
    Ok(url)
}

/// Generate `count` distinct numeric keys
pub fn generate_keys(count: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        // Non-negative 63-bit integer, the shape etcd users expect from numeric keys
        let key = Uuid::new_v4().as_u64_pair().0 >> 1;
        if seen.insert(key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// PUTs in flight after dispatch
pub struct RandomKeyRun {
    keys: Vec<Url>,
    dispatch: Duration,
    started: Instant,
    handles: Vec<JoinHandle<()>>,
}

impl RandomKeyRun {
    pub fn keys(&self) -> &[Url] {
        &self.keys
    }

    /// Time spent spawning the PUT tasks
    pub fn dispatch(&self) -> Duration {
        self.dispatch
    }

    /// Wait for every PUT and report the time since dispatch began
    pub async fn wait_all(mut self) -> Result<RandomKeyReport> {
        let results = futures::future::join_all(self.handles.iter_mut()).await;
        self.finish(results)
    }

    /// Like [`RandomKeyRun::wait_all`], but gives up after `limit`
    ///
    /// PUTs still retrying at the deadline are aborted rather than left
    /// running in the background.
    pub async fn wait_all_within(mut self, limit: Duration) -> Result<RandomKeyReport> {
        let joined = futures::future::join_all(self.handles.iter_mut());
        let outcome = tokio::time::timeout(limit, joined).await;

        match outcome {
            Ok(results) => self.finish(results),
            Err(_) => {
                let pending = self.handles.iter().filter(|h| !h.is_finished()).count();
                for handle in &self.handles {
                    handle.abort();
                }
                Err(AppError::timeout(format!(
                    "{}/{} random-key writes not acknowledged within {:?}",
                    pending,
                    self.keys.len(),
                    limit
                )))
            }
        }
    }

    fn finish(self, results: Vec<std::result::Result<(), JoinError>>) -> Result<RandomKeyReport> {
        let completion = self.started.elapsed();

        for result in results {
            result.map_err(|e| AppError::internal(format!("PUT task failed: {}", e)))?;
        }

        Ok(RandomKeyReport {
            connection_count: self.keys.len(),
            keys: self.keys.iter().map(Url::to_string).collect(),
            dispatch: self.dispatch,
            completion: Some(completion),
        })
    }
}

/// Spawn one PUT `value=<key>` per generated key and return immediately
pub fn dispatch(
    transport: Arc<dyn Transport>,
    base: &Url,
    count: usize,
    policy: RetryPolicy,
    logger: Arc<NetworkLogger>,
) -> Result<RandomKeyRun> {
    let keys = generate_keys(count);
    let urls = keys
        .iter()
        .map(|key| random_key_url(base, key))
        .collect::<Result<Vec<_>>>()?;

    let started = Instant::now();
    let handles = keys
        .into_iter()
        .zip(urls.iter().cloned())
        .map(|(key, url)| {
            let transport = transport.clone();
            let logger = logger.clone();
            tokio::spawn(async move {
                let request = HttpRequest::put_value(&url, &key);
                let _ = perform(transport.as_ref(), &request, policy, &logger, LogLevel::Warn).await;
            })
        })
        .collect();
    let dispatch = started.elapsed();

    Ok(RandomKeyRun {
        keys: urls,
        dispatch,
        started,
        handles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResponseBody;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts writes whose key ends in an even digit and refuses the rest
    struct PickyTransport {
        refused: AtomicUsize,
    }

    struct Empty;

    #[async_trait]
    impl ResponseBody for Empty {
        fn status(&self) -> u16 {
            201
        }

        async fn read_to_end(&mut self) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl Transport for PickyTransport {
        async fn send(&self, request: &HttpRequest) -> Result<Box<dyn ResponseBody>> {
            let even = request
                .url
                .path()
                .chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .is_some_and(|d| d % 2 == 0);
            if even {
                Ok(Box::new(Empty))
            } else {
                self.refused.fetch_add(1, Ordering::SeqCst);
                Err(AppError::transport("connection refused"))
            }
        }
    }

    fn base() -> Url {
        Url::parse("http://127.0.0.1:2379/v2/keys/name").unwrap()
    }

    #[test]
    fn test_random_key_url_replaces_last_segment() {
        let base = Url::parse("http://127.0.0.1:2379/v2/keys/name?wait=true").unwrap();
        let url = random_key_url(&base, "12345").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:2379/v2/keys/12345");
    }

    #[test]
    fn test_random_key_url_with_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:2379/v2/keys/").unwrap();
        let url = random_key_url(&base, "42").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:2379/v2/keys/42");

        let dir = Url::parse("http://127.0.0.1:2379/v2/keys/dir/name").unwrap();
        assert_eq!(
            random_key_url(&dir, "42").unwrap().as_str(),
            "http://127.0.0.1:2379/v2/keys/dir/42"
        );
    }

    #[test]
    fn test_generate_zero_keys() {
        assert!(generate_keys(0).is_empty());
    }

    #[tokio::test]
    async fn test_empty_run_completes_within_limit() {
        let transport = Arc::new(PickyTransport { refused: AtomicUsize::new(0) });
        let run = dispatch(
            transport,
            &base(),
            0,
            RetryPolicy::fixed(Duration::from_millis(1)),
            Arc::new(NetworkLogger::quiet()),
        )
        .unwrap();

        let report = run.wait_all_within(Duration::from_secs(1)).await.unwrap();
        assert_eq!(report.connection_count, 0);
        assert!(report.completion.is_some());
    }

    #[tokio::test]
    async fn test_wait_all_within_aborts_refused_writes() {
        let transport = Arc::new(PickyTransport { refused: AtomicUsize::new(0) });
        let run = dispatch(
            transport.clone(),
            &base(),
            40,
            RetryPolicy::fixed(Duration::from_millis(1)),
            Arc::new(NetworkLogger::quiet()),
        )
        .unwrap();
        let odd = run
            .keys()
            .iter()
            .filter(|url| url.path().ends_with(|c: char| matches!(c, '1' | '3' | '5' | '7' | '9')))
            .count();

        match run.wait_all_within(Duration::from_millis(100)).await {
            Err(AppError::Timeout(message)) => {
                assert!(message.contains(&format!("{}/40", odd)), "{}", message);
            }
            Err(other) => panic!("expected timeout, got {}", other),
            Ok(report) => {
                // Only possible when every generated key happened to end in an even digit
                assert_eq!(odd, 0);
                assert!(report.completion.is_some());
            }
        }

        // Aborted tasks stop retrying
        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = transport.refused.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.refused.load(Ordering::SeqCst), settled);
    }

    proptest! {
        #[test]
        fn prop_generated_keys_are_distinct_numbers(count in 0usize..200) {
            let keys = generate_keys(count);
            prop_assert_eq!(keys.len(), count);
            let unique: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(unique.len(), count);
            for key in &keys {
                prop_assert!(key.parse::<i64>().is_ok());
            }
        }
    }
}
