//! HTTP exchange abstraction
//!
//! The executor only needs "send these bytes, give me a status and a body
//! stream". Keeping that behind [`Transport`] lets tests count and script
//! attempts, and lets embedders bring their own HTTP stack.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use http::{HeaderMap, StatusCode};
use url::Url;

/// Response body as it arrives from the wire
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Idle pooled connections are dropped after this long
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure below the HTTP layer: no usable response was received
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// DNS, refused or reset connection, TLS failure
    #[error("connection failed: {0}")]
    Connect(String),
    /// The transport's own timer fired
    #[error("transport timed out: {0}")]
    Timeout(String),
    /// The body stream broke after headers were received
    #[error("failed to read response body: {0}")]
    Body(String),
    /// Anything else reqwest reports
    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_connect() {
            Self::Connect(message)
        } else if err.is_body() || err.is_decode() {
            Self::Body(message)
        } else {
            Self::Other(message)
        }
    }
}

/// One outbound POST
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Full endpoint URL
    pub url: Url,
    /// Headers, authorization included
    pub headers: HeaderMap,
    /// Serialized JSON body
    pub body: Bytes,
}

/// Status plus a streaming body
pub struct HttpResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body chunks in wire order
    pub body: ByteStream,
}

impl HttpResponse {
    /// Wrap a status and a body stream
    pub fn new(status: StatusCode, body: ByteStream) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// A response whose body is already fully buffered
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, Box::pin(stream::once(async move { Ok(body) })))
    }

    /// Drain the body into one buffer
    pub async fn bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }

    /// Drain the body as (lossy) UTF-8 text
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs a single HTTP exchange
///
/// Implementations must not retry; the executor owns the retry policy.
/// Dropping the returned future (or the body stream) must abort the
/// exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return once response headers are in
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport with a pooled keep-alive client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the pooled client
    ///
    /// The connect timeout is capped by `call_timeout` so a dead host
    /// cannot consume more than the whole call budget.
    pub fn new(call_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(call_timeout))
            .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .tcp_nodelay(true)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()?;

        Ok(Self { client })
    }

    /// Use an already configured reqwest client
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(TransportError::from));

        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
