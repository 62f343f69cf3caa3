//! HTTP transport for the key-value service
//!
//! The benchmark needs to see the moment response headers arrive separately from
//! the moment the body has been read, so the transport is split in two steps:
//! [`Transport::send`] resolves as soon as the status line and headers are in,
//! and [`ResponseBody::read_to_end`] performs the (possibly unbounded) body read.

pub mod retry;

pub use retry::{perform, retry_forever, RetryContext, RetryPolicy};

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use url::Url;

/// Transport trait for abstraction and testing
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return once response headers have been received
    async fn send(&self, request: &HttpRequest) -> Result<Box<dyn ResponseBody>>;
}

/// A response whose headers have arrived but whose body has not been read
#[async_trait]
pub trait ResponseBody: Send {
    /// Status code; informational only, never treated as failure
    fn status(&self) -> u16;

    /// Read the whole body
    async fn read_to_end(&mut self) -> Result<Vec<u8>>;
}

/// HTTP request against the key endpoint
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    /// URL-encoded form body
    pub form_body: Option<String>,
}

impl HttpRequest {
    /// `GET {key}?wait=true`, the long-poll watch
    pub fn long_poll(key_url: &Url) -> Self {
        let mut url = key_url.clone();
        url.query_pairs_mut().append_pair("wait", "true");
        Self {
            method: Method::GET,
            url,
            form_body: None,
        }
    }

    /// `PUT {key}` with body `value=<value>`
    pub fn put_value(key_url: &Url, value: &str) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("value", value)
            .finish();
        Self {
            method: Method::PUT,
            url: key_url.clone(),
            form_body: Some(body),
        }
    }

    pub fn method_str(&self) -> &str {
        self.method.as_str()
    }
}

/// Connection settings for the reqwest-backed transport
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Bound on TCP connect; `None` leaves connects unbounded
    pub connect_timeout: Option<Duration>,
    /// Interval between TCP keep-alives for the held connections
    pub tcp_keep_alive: Option<Duration>,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            tcp_keep_alive: Some(Duration::from_secs(60)),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            user_agent: format!("{}/{}", crate::PKG_NAME, crate::VERSION),
        }
    }
}

/// Transport backed by a shared `reqwest::Client`
///
/// No request timeout is configured: a long-poll may legitimately stay open for
/// as long as the trigger takes to arrive.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(pool_config: PoolConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(pool_config.user_agent)
            .pool_idle_timeout(pool_config.pool_idle_timeout);

        if let Some(connect_timeout) = pool_config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(keep_alive) = pool_config.tcp_keep_alive {
            builder = builder.tcp_keepalive(keep_alive);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(PoolConfig::default())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<Box<dyn ResponseBody>> {
        let mut builder = self.client.request(request.method.clone(), request.url.clone());

        if let Some(body) = &request.form_body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::transport(e.to_string()))?;

        Ok(Box::new(ReqwestBody {
            status: response.status().as_u16(),
            response: Some(response),
        }))
    }
}

struct ReqwestBody {
    status: u16,
    response: Option<reqwest::Response>,
}

#[async_trait]
impl ResponseBody for ReqwestBody {
    fn status(&self) -> u16 {
        self.status
    }

    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let response = self
            .response
            .take()
            .ok_or_else(|| AppError::body_read("response body already consumed"))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::body_read(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
