//! OpenAI-compatible chat completion wire format

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{ChatMessage, ModelParams, Usage};

// -- Request types --

/// `POST /chat/completions` body
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionPayload<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(flatten)]
    pub params: &'a ModelParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat<'a>>,
}

/// Structured output directive
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ResponseFormat<'a> {
    JsonSchema { json_schema: JsonSchemaWire<'a> },
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSchemaWire<'a> {
    pub name: &'a str,
    pub strict: bool,
    pub schema: &'a Value,
}

// -- Response types --

/// Non-streaming body; every field tolerated as absent
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompletionBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default, deserialize_with = "lenient_usage")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// -- Streaming types --

/// One `data:` frame of a streamed completion
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default, deserialize_with = "lenient_usage")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Usage in an unexpected shape is dropped rather than failing the body
fn lenient_usage<'de, D>(deserializer: D) -> Result<Option<Usage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Usage::deserialize(value).ok())
}
