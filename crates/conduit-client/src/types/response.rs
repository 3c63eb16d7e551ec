use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Model name reported when the provider does not echo one
pub const UNKNOWN_MODEL: &str = "unknown";

/// Token accounting, when the provider reports it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default, deserialize_with = "count")]
    pub prompt_tokens: u32,
    /// Tokens generated
    #[serde(default, deserialize_with = "count")]
    pub completion_tokens: u32,
    /// Sum of both
    #[serde(default, deserialize_with = "count")]
    pub total_tokens: u32,
}

/// Some providers send `null` for counters they do not track
fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized result of one call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Provider completion id, empty when absent
    pub id: String,
    /// Model that answered, or [`UNKNOWN_MODEL`]
    pub model: String,
    /// First choice's text
    pub content: String,
    /// Why generation stopped
    pub finish_reason: Option<String>,
    /// Token usage
    pub usage: Option<Usage>,
    /// Untouched provider payload; an array of chunks for streamed calls
    pub raw: Value,
}

/// Result of a structured call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatJsonResponse<T> {
    /// `raw.content` decoded as `T`
    pub parsed: T,
    /// The response the value was decoded from
    pub raw: ChatResponse,
}
