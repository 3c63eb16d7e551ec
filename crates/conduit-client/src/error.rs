use std::time::Duration;

use http::StatusCode;
use serde_json::{Value, json};
use strum::{Display, IntoStaticStr};

use crate::transport::TransportError;

/// Client-specific result type
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Longest slice of a provider error body kept for diagnostics
const BODY_SNIPPET_CHARS: usize = 500;

/// Wording in a 400 body that means the prompt was too long
const CONTEXT_LENGTH_MARKERS: &[&str] = &[
    "context length",
    "context_length",
    "maximum context",
    "token limit",
    "too many tokens",
    "max_tokens",
];

/// Wording in a 400 body that means the content was refused
const CONTENT_FILTER_MARKERS: &[&str] = &[
    "content filter",
    "content_filter",
    "content policy",
    "moderation",
    "flagged",
    "safety",
];

/// Closed set of failure classes a caller can switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or rejected credential (401/403)
    Authorization,
    /// Provider throttled the request (429)
    RateLimit,
    /// Request rejected as malformed, before or by the provider
    Validation,
    /// Prompt exceeded the model's context window
    ContextLength,
    /// Provider refused the content
    ContentFilter,
    /// Deadline exceeded or call cancelled
    Timeout,
    /// Connection-level failure with no HTTP response
    Network,
    /// Response body was not the JSON we expected
    Parse,
    /// Provider-side failure (5xx)
    ServerError,
}

impl ErrorKind {
    /// Whether the executor may retry a failure of this kind
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::Network | Self::ServerError
        )
    }

    /// Stable snake_case label, used in logs
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The only error type a gateway call returns
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
    http_status: Option<u16>,
    details: Option<Value>,
}

impl GatewayError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            details: None,
        }
    }

    /// Attach the HTTP status that produced this error
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attach structured diagnostics
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    /// The internal deadline fired
    pub(crate) fn deadline(timeout: Duration) -> Self {
        let timeout_ms = crate::scope::millis(timeout);
        Self::new(ErrorKind::Timeout, format!("request timed out after {timeout_ms}ms"))
            .with_details(json!({ "cancelled": false, "timeout_ms": timeout_ms }))
    }

    /// The caller's cancellation token fired
    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Timeout, "request cancelled by caller").with_details(json!({ "cancelled": true }))
    }

    /// Failure class
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable description
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, when the provider answered
    pub const fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Structured diagnostics (parsed error body, content snippet, ...)
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether the executor may retry this failure
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Whether this error came from the caller's own cancellation
    pub fn is_cancelled(&self) -> bool {
        self.details
            .as_ref()
            .and_then(|d| d.get("cancelled"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Classify a non-2xx provider response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let kind = match code {
            401 | 403 => ErrorKind::Authorization,
            408 => ErrorKind::Timeout,
            413 => ErrorKind::ContextLength,
            429 => ErrorKind::RateLimit,
            400 => kind_from_wording(body).unwrap_or(ErrorKind::Validation),
            402..=499 => ErrorKind::Validation,
            _ => ErrorKind::ServerError,
        };

        let reason = status.canonical_reason().unwrap_or("unexpected status");
        let message = match provider_message(body) {
            Some(detail) => format!("provider returned {code} {reason}: {detail}"),
            None => format!("provider returned {code} {reason}"),
        };

        Self::new(kind, message)
            .with_status(code)
            .with_details(body_details(body))
    }

    /// Classify an error object embedded in a 200 body or a stream frame
    ///
    /// Numeric `code` values are treated as HTTP statuses; otherwise the
    /// wording decides, and anything unrecognized is a provider failure.
    pub(crate) fn from_embedded(error: &Value) -> Self {
        let text = error.to_string();
        let status = error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .and_then(|c| StatusCode::from_u16(c).ok());

        if let Some(status) = status {
            let mut classified = Self::from_status(status, &json!({ "error": error }).to_string());
            classified.message = format!("provider reported an error: {}", classified.message);
            return classified;
        }

        let kind = kind_from_wording(&text).unwrap_or(ErrorKind::ServerError);
        let detail = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| snippet(&text, BODY_SNIPPET_CHARS), |m| snippet(m, BODY_SNIPPET_CHARS));

        Self::new(kind, format!("provider reported an error: {detail}")).with_details(error.clone())
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        let kind = match err {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connect(_) | TransportError::Body(_) | TransportError::Other(_) => ErrorKind::Network,
        };
        Self::new(kind, err.to_string())
    }
}

/// First `max_chars` characters of `text`, never splitting a character
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_owned(),
        None => text.to_owned(),
    }
}

fn kind_from_wording(body: &str) -> Option<ErrorKind> {
    let lowered = body.to_lowercase();
    if CONTEXT_LENGTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        Some(ErrorKind::ContextLength)
    } else if CONTENT_FILTER_MARKERS.iter().any(|m| lowered.contains(m)) {
        Some(ErrorKind::ContentFilter)
    } else {
        None
    }
}

/// Pull a message out of `{"error": {"message": ...}}` or `{"message": ...}`
fn provider_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return Some(snippet(trimmed, BODY_SNIPPET_CHARS));
    };

    json.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .or_else(|| json.get("message"))
        .and_then(Value::as_str)
        .map(|m| snippet(m, BODY_SNIPPET_CHARS))
}

fn body_details(body: &str) -> Value {
    serde_json::from_str::<Value>(body).unwrap_or_else(|_| json!({ "body": snippet(body, BODY_SNIPPET_CHARS) }))
}
