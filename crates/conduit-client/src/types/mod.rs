//! Caller-facing request and response types

mod message;
mod request;
mod response;

pub use message::*;
pub use request::*;
pub use response::*;
