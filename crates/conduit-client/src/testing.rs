//! Scripted transport for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use http::StatusCode;
use serde_json::Value;
use tokio::time::Instant;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// One canned outcome of `send`
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Status plus a buffered body
    Status(StatusCode, Bytes),
    /// 200 whose body arrives in these parts; optionally never ends
    Stream { parts: Vec<Bytes>, hang: bool },
    /// Fail below HTTP
    Error(TransportError),
    /// Never answer
    Hang,
}

impl Reply {
    pub(crate) fn status(code: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(code).unwrap();
        Self::Status(status, Bytes::copy_from_slice(body.as_bytes()))
    }

    pub(crate) fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn stream(parts: &[&str]) -> Self {
        Self::Stream {
            parts: parts.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())).collect(),
            hang: false,
        }
    }

    pub(crate) fn stream_then_hang(parts: &[&str]) -> Self {
        match Self::stream(parts) {
            Self::Stream { parts, .. } => Self::Stream { parts, hang: true },
            other => other,
        }
    }

    pub(crate) fn connect_error() -> Self {
        Self::Error(TransportError::Connect("connection refused".to_owned()))
    }
}

/// Plays back replies in order and records every request
///
/// Once the script runs out, the fallback reply (if any) repeats forever.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    calls: Mutex<Vec<(Instant, HttpRequest)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn repeat(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().iter().map(|(_, req)| req.clone()).collect()
    }

    /// Request bodies decoded as JSON
    pub(crate) fn bodies(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|req| serde_json::from_slice(&req.body).unwrap())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push((Instant::now(), request));

        let reply = self.script.lock().unwrap().pop_front().or_else(|| self.fallback.clone());
        let Some(reply) = reply else {
            panic!("scripted transport ran out of replies");
        };

        match reply {
            Reply::Status(status, body) => Ok(HttpResponse::from_bytes(status, body)),
            Reply::Stream { parts, hang } => {
                let chunks = stream::iter(parts.into_iter().map(Ok::<_, TransportError>));
                let body = if hang {
                    chunks.chain(stream::pending()).boxed()
                } else {
                    chunks.boxed()
                };
                Ok(HttpResponse::new(StatusCode::OK, body))
            }
            Reply::Error(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }
}
