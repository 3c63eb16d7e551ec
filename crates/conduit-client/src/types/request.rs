use conduit_config::DefaultParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::message::ChatMessage;

/// Generation knobs
///
/// Unset fields are omitted from the wire payload so the provider applies
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold (0.0 to 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Presence penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Seed for reproducible sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl From<&DefaultParams> for ModelParams {
    fn from(defaults: &DefaultParams) -> Self {
        Self {
            temperature: defaults.temperature,
            top_p: defaults.top_p,
            max_tokens: defaults.max_tokens,
            presence_penalty: defaults.presence_penalty,
            frequency_penalty: defaults.frequency_penalty,
            stop: defaults.stop.clone(),
            seed: defaults.seed,
        }
    }
}

/// Provider-enforced output shape for structured calls
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchemaSpec {
    /// Schema name, `[A-Za-z0-9_-]{1,64}`
    pub name: String,
    /// JSON Schema object
    pub schema: Value,
}

impl JsonSchemaSpec {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Always true: structured output is only requested in strict mode
    pub const fn strict(&self) -> bool {
        true
    }
}

/// One chat call
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Conversation, in order
    pub messages: Vec<ChatMessage>,
    /// Overrides the client's default model
    pub model: Option<String>,
    /// Overrides the client's default params field by field
    pub params: Option<ModelParams>,
    /// Forwarded as `response_format` by `chat` and `chat_stream`, which
    /// never decode against it; `chat_json` sends its own schema instead
    pub response_format: Option<JsonSchemaSpec>,
    /// Caller abort; fires as a cancelled `Timeout`
    pub signal: Option<CancellationToken>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn with_response_format(mut self, format: JsonSchemaSpec) -> Self {
        self.response_format = Some(format);
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}
