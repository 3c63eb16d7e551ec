//! Mock OpenAI-compatible provider for integration tests
//!
//! Serves `POST /v1/chat/completions` with canned answers, scripted
//! failures and SSE streams, and records what it received.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const DEFAULT_CONTENT: &str = "Hello from the mock provider";

/// A request as the provider saw it
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

/// How the mock answers once scripted failures are used up
#[derive(Debug, Clone)]
enum Answer {
    /// Normal completion (or stream) with this content
    Content(String),
    /// Fixed status and JSON body on every request
    Status(StatusCode, Value),
}

/// Mock provider running on an ephemeral port
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    /// Requests still to fail before answering normally
    fail_count: AtomicU32,
    fail_status: StatusCode,
    answer: Answer,
    /// Wait this long before answering
    delay: Option<Duration>,
    /// Streams send their first chunk and then stall
    hang_stream: bool,
    /// Streams end frames with a single newline
    compact_frames: bool,
    received: Mutex<Vec<ReceivedRequest>>,
}

/// Builder for [`MockProvider`]
pub struct MockProviderBuilder {
    fail_count: u32,
    fail_status: StatusCode,
    answer: Answer,
    delay: Option<Duration>,
    hang_stream: bool,
    compact_frames: bool,
}

impl MockProviderBuilder {
    /// Fail the first `n` requests with `status`
    pub const fn fail_first(mut self, n: u32, status: StatusCode) -> Self {
        self.fail_count = n;
        self.fail_status = status;
        self
    }

    /// Answer with this assistant content
    pub fn content(mut self, content: &str) -> Self {
        self.answer = Answer::Content(content.to_owned());
        self
    }

    /// Answer every request with this status and body
    pub fn status(mut self, status: StatusCode, body: Value) -> Self {
        self.answer = Answer::Status(status, body);
        self
    }

    /// Sleep before answering
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stall streams after the first chunk
    pub const fn hang_stream(mut self) -> Self {
        self.hang_stream = true;
        self
    }

    /// Separate stream frames by one newline, with no newline after `[DONE]`
    pub const fn compact_frames(mut self) -> Self {
        self.compact_frames = true;
        self
    }

    pub async fn start(self) -> anyhow::Result<MockProvider> {
        let state = Arc::new(MockState {
            request_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(self.fail_count),
            fail_status: self.fail_status,
            answer: self.answer,
            delay: self.delay,
            hang_stream: self.hang_stream,
            compact_frames: self.compact_frames,
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockProvider { addr, shutdown, state })
    }
}

impl MockProvider {
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder {
            fail_count: 0,
            fail_status: StatusCode::INTERNAL_SERVER_ERROR,
            answer: Answer::Content(DEFAULT_CONTENT.to_owned()),
            delay: None,
            hang_stream: false,
            compact_frames: false,
        }
    }

    /// Start a provider that answers every request normally
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Base URL including `/v1`; the client appends `/chat/completions`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Content the provider answers with by default
    pub const fn default_content() -> &'static str {
        DEFAULT_CONTENT
    }

    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Handlers --

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    state.received.lock().unwrap().push(ReceivedRequest {
        headers,
        body: body.clone(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let remaining = state.fail_count.load(Ordering::Relaxed);
    if remaining > 0 {
        state.fail_count.fetch_sub(1, Ordering::Relaxed);
        let error = json!({
            "error": {
                "message": "mock provider intentional failure",
                "code": state.fail_status.as_u16()
            }
        });
        return (state.fail_status, Json(error)).into_response();
    }

    let content = match &state.answer {
        Answer::Status(status, error) => return (*status, Json(error.clone())).into_response(),
        Answer::Content(content) => content.clone(),
    };

    let model = body["model"].as_str().unwrap_or("mock/unknown").to_owned();

    if body["stream"].as_bool().unwrap_or(false) {
        return streaming_response(&model, &content, state.hang_stream, state.compact_frames);
    }

    Json(json!({
        "id": "chatcmpl-mock-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    }))
    .into_response()
}

/// SSE body: one chunk per word, a finish chunk with usage, then `[DONE]`
fn streaming_response(model: &str, content: &str, hang: bool, compact: bool) -> Response {
    let end = if compact { "\n" } else { "\n\n" };

    let mut frames: Vec<Bytes> = content
        .split_inclusive(' ')
        .enumerate()
        .map(|(i, word)| {
            let mut chunk = json!({
                "object": "chat.completion.chunk",
                "choices": [{ "index": 0, "delta": { "content": word } }]
            });
            if i == 0 {
                chunk["id"] = json!("chatcmpl-mock-stream");
                chunk["model"] = json!(model);
            }
            Bytes::from(format!("data: {chunk}{end}"))
        })
        .collect();

    if hang {
        frames.truncate(1);
        let body = stream::iter(frames.into_iter().map(Ok::<_, Infallible>)).chain(stream::pending());
        return sse_response(Body::from_stream(body));
    }

    let finish = json!({
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    });
    frames.push(Bytes::from(format!("data: {finish}{end}")));
    frames.push(if compact {
        Bytes::from_static(b"data: [DONE]")
    } else {
        Bytes::from_static(b"data: [DONE]\n\n")
    });

    sse_response(Body::from_stream(stream::iter(frames.into_iter().map(Ok::<_, Infallible>))))
}

fn sse_response(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
