//! The single write that resolves every outstanding watch

use crate::client::{perform, HttpRequest, RetryPolicy, Transport};
use crate::logging::{LogLevel, NetworkLogger};
use url::Url;

/// PUT `value=<payload>` to the watched key, retrying until the service accepts it
///
/// Every failed attempt is logged at warn level. The response body is
/// discarded and the status code is not inspected.
pub async fn issue_trigger(
    transport: &dyn Transport,
    key_url: &Url,
    payload: &str,
    policy: RetryPolicy,
    logger: &NetworkLogger,
) {
    let request = HttpRequest::put_value(key_url, payload);
    let _ = perform(transport, &request, policy, logger, LogLevel::Warn).await;
}
