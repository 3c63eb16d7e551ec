//! Streaming chat: SSE decoding and caller callbacks
//!
//! Frames are `data: {json}` lines terminated by `data: [DONE]`. Each
//! complete line is handled as soon as its newline arrives, whether the
//! provider separates frames with a blank line or a single newline. Line
//! reassembly (partial lines, `\r\n`, comments, multi-byte characters
//! split across reads) is handled by `eventsource-stream`; this module
//! turns lines into deltas and one aggregated [`ChatResponse`].

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{StreamExt, future, stream};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::protocol::StreamChunk;
use crate::scope::CallScope;
use crate::transport::ByteStream;
use crate::types::{ChatResponse, UNKNOWN_MODEL, Usage};

/// End-of-stream sentinel payload
const DONE: &str = "[DONE]";

/// Receives the outcome of a streaming call
///
/// `on_chunk` fires once per non-empty delta in wire order. Exactly one of
/// `on_complete` or `on_error` fires last, and nothing fires after it.
pub trait StreamHandler {
    /// A content delta, not the running total
    fn on_chunk(&mut self, delta: &str);

    /// The aggregated response after a clean end of stream
    fn on_complete(&mut self, response: ChatResponse);

    /// The terminal failure
    fn on_error(&mut self, error: GatewayError);
}

/// [`StreamHandler`] built from three closures
pub struct Callbacks<C, D, E> {
    pub on_chunk: C,
    pub on_complete: D,
    pub on_error: E,
}

impl<C, D, E> Callbacks<C, D, E>
where
    C: FnMut(&str),
    D: FnMut(ChatResponse),
    E: FnMut(GatewayError),
{
    pub const fn new(on_chunk: C, on_complete: D, on_error: E) -> Self {
        Self {
            on_chunk,
            on_complete,
            on_error,
        }
    }
}

impl<C, D, E> StreamHandler for Callbacks<C, D, E>
where
    C: FnMut(&str),
    D: FnMut(ChatResponse),
    E: FnMut(GatewayError),
{
    fn on_chunk(&mut self, delta: &str) {
        (self.on_chunk)(delta);
    }

    fn on_complete(&mut self, response: ChatResponse) {
        (self.on_complete)(response);
    }

    fn on_error(&mut self, error: GatewayError) {
        (self.on_error)(error);
    }
}

/// Outcome of applying one `data:` payload
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Continue,
    Done,
}

/// Running state of one stream
#[derive(Debug, Default)]
struct StreamAggregator {
    id: Option<String>,
    model: Option<String>,
    content: String,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    chunks: Vec<Value>,
}

impl StreamAggregator {
    /// Fold one payload into the aggregate
    ///
    /// Unparseable payloads are skipped. An embedded `error` object ends
    /// the stream with that error.
    fn apply(&mut self, data: &str, on_delta: &mut impl FnMut(&str)) -> Result<Frame> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(Frame::Continue);
        }
        if data == DONE {
            return Ok(Frame::Done);
        }

        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                return Ok(Frame::Continue);
            }
        };

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            return Err(GatewayError::from_embedded(error));
        }

        let chunk = match StreamChunk::deserialize(&value) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping SSE chunk with unexpected shape");
                return Ok(Frame::Continue);
            }
        };

        if self.id.is_none() {
            self.id = chunk.id.filter(|id| !id.is_empty());
        }
        if self.model.is_none() {
            self.model = chunk.model.filter(|model| !model.is_empty());
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        if let Some(choice) = chunk.choices.into_iter().next() {
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
            if let Some(delta) = choice.delta.and_then(|d| d.content).filter(|c| !c.is_empty()) {
                self.content.push_str(&delta);
                on_delta(&delta);
            }
        }

        self.chunks.push(value);
        Ok(Frame::Continue)
    }

    fn finish(self) -> ChatResponse {
        ChatResponse {
            id: self.id.unwrap_or_default(),
            model: self.model.unwrap_or_else(|| UNKNOWN_MODEL.to_owned()),
            content: self.content,
            finish_reason: self.finish_reason,
            usage: self.usage,
            raw: Value::Array(self.chunks),
        }
    }
}

/// Drive a streaming body to completion
///
/// Every read is raced against the call scope, and the scope is checked
/// again before each payload so no delta is delivered after cancellation.
/// The body is dropped on every return path.
pub(crate) async fn decode<F>(body: ByteStream, scope: &CallScope, mut on_delta: F) -> Result<ChatResponse>
where
    F: FnMut(&str),
{
    let mut events = line_framed(body).eventsource();
    let mut aggregate = StreamAggregator::default();

    while let Some(next) = scope.guard(events.next()).await? {
        let event = match next {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable SSE event");
                continue;
            }
        };

        for line in event.data.lines() {
            scope.check()?;
            if aggregate.apply(line, &mut on_delta)? == Frame::Done {
                return Ok(aggregate.finish());
            }
        }
    }

    Ok(aggregate.finish())
}

/// Turn every line of `body` into its own event
///
/// `eventsource-stream` only dispatches on a blank line and drops a pending
/// event at end of stream. Doubling each `\n` ends an event after every
/// line, and a trailing blank line flushes a last line left unterminated.
/// `\n` never occurs inside a multi-byte UTF-8 sequence.
fn line_framed(body: ByteStream) -> ByteStream {
    Box::pin(
        body.map(|chunk| chunk.map(|bytes| blank_after_each_newline(&bytes)))
            .chain(stream::once(future::ready(Ok(Bytes::from_static(b"\n\n"))))),
    )
}

fn blank_after_each_newline(bytes: &Bytes) -> Bytes {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    if newlines == 0 {
        return bytes.clone();
    }

    let mut framed = Vec::with_capacity(bytes.len() + newlines);
    for &b in bytes {
        framed.push(b);
        if b == b'\n' {
            framed.push(b'\n');
        }
    }
    Bytes::from(framed)
}
