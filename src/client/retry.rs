//! Retry-forever discipline for requests against the key-value service
//!
//! Transient transport and body-read failures are absorbed here: the caller
//! only ever sees success. Every failed attempt costs one fixed delay, which
//! lands directly in the measured latency of any session that fails after the
//! trigger, so the delay is kept configurable.

use super::{HttpRequest, Transport};
use crate::error::Result;
use crate::logging::{LogLevel, NetworkLogger};
use std::future::Future;
use std::time::Duration;

/// Fixed backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(crate::defaults::DEFAULT_RETRY_DELAY)
    }
}

/// Where and how loudly failed attempts are logged
pub struct RetryContext<'a> {
    pub logger: &'a NetworkLogger,
    pub level: LogLevel,
    pub method: &'a str,
    pub url: &'a str,
}

/// Run `operation` until it succeeds, sleeping `policy.delay` after each failure
pub async fn retry_forever<T, F, Fut>(policy: RetryPolicy, context: &RetryContext<'_>, mut operation: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    context.logger.log_recovered(context.method, context.url, attempt).await;
                }
                return value;
            }
            Err(error) => {
                context
                    .logger
                    .log_retry(
                        context.level,
                        context.method,
                        context.url,
                        attempt,
                        &error,
                        policy.delay.as_millis(),
                    )
                    .await;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Perform one request to completion, body included, retrying forever
///
/// Status codes are not inspected; only transport and body-read failures
/// trigger a retry.
pub async fn perform(
    transport: &dyn Transport,
    request: &HttpRequest,
    policy: RetryPolicy,
    logger: &NetworkLogger,
    level: LogLevel,
) -> Vec<u8> {
    let url = request.url.to_string();
    let context = RetryContext {
        logger,
        level,
        method: request.method_str(),
        url: &url,
    };

    retry_forever(policy, &context, move || async move {
        let mut response = transport.send(request).await?;
        response.read_to_end().await
    })
    .await
}
