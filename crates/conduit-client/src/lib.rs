#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Outbound gateway client for an OpenAI-compatible LLM provider
//!
//! One long-lived [`GatewayClient`] per configuration; every call is an
//! independent unit of work with its own deadline, retry budget, and
//! optional caller cancellation. All failures surface as a
//! [`GatewayError`] tagged with an [`ErrorKind`].

mod client;
pub mod error;
mod executor;
mod normalize;
mod payload;
mod protocol;
pub mod retry;
mod scope;
pub mod sse;
mod structured;
pub mod transport;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

pub use client::{DEFAULT_BASE_URL, GatewayClient};
pub use error::{ErrorKind, GatewayError, Result};
pub use retry::RetryPolicy;
pub use sse::{Callbacks, StreamHandler};
pub use structured::PARSE_SNIPPET_CHARS;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport, TransportError};
pub use types::*;
