//! Pre-flight request checks
//!
//! Everything here is a pure function of the request and the client's
//! defaults, run before any I/O. Every failure is a `Validation` error.

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::types::{ChatRequest, JsonSchemaSpec, ModelParams, Role};

/// Most messages accepted in one request
pub const MAX_MESSAGES: usize = 100;

/// Longest message content accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 100_000;

/// Most stop sequences accepted by OpenAI-compatible providers
pub const MAX_STOP_SEQUENCES: usize = 4;

/// Longest schema name accepted by structured-output mode
pub const MAX_SCHEMA_NAME_CHARS: usize = 64;

/// Check message structure and resolve the model
///
/// Returns the model the call will use: the request's own, or the
/// client default. An explicitly blank model is rejected rather than
/// silently replaced.
pub fn validate_request<'a>(request: &'a ChatRequest, default_model: Option<&'a str>) -> Result<&'a str> {
    let messages = &request.messages;

    if messages.is_empty() {
        return Err(GatewayError::validation("request has no messages"));
    }
    if messages.len() > MAX_MESSAGES {
        return Err(GatewayError::validation(format!(
            "request has {} messages, at most {MAX_MESSAGES} are allowed",
            messages.len()
        )));
    }

    for (index, message) in messages.iter().enumerate() {
        if message.content.trim().is_empty() {
            return Err(GatewayError::validation(format!("message {index} has empty content")));
        }
        let chars = message.content.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(GatewayError::validation(format!(
                "message {index} is {chars} characters, at most {MAX_MESSAGE_CHARS} are allowed"
            )));
        }
    }

    let system = messages.iter().filter(|m| m.role == Role::System).count();
    if system > 1 {
        return Err(GatewayError::validation(format!(
            "request has {system} system messages, at most one is allowed"
        )));
    }
    if !messages.iter().any(|m| m.role == Role::User) {
        return Err(GatewayError::validation("request has no user message"));
    }

    match (request.model.as_deref(), default_model) {
        (Some(model), _) if model.trim().is_empty() => Err(GatewayError::validation("model must not be blank")),
        (Some(model), _) | (None, Some(model)) => Ok(model),
        (None, None) => Err(GatewayError::validation(
            "no model given and the client has no default model",
        )),
    }
}

/// Check merged generation params against the provider's accepted ranges
pub fn validate_params(params: &ModelParams) -> Result<()> {
    check_range("temperature", params.temperature, 0.0, 2.0)?;
    check_range("top_p", params.top_p, 0.0, 1.0)?;
    check_range("presence_penalty", params.presence_penalty, -2.0, 2.0)?;
    check_range("frequency_penalty", params.frequency_penalty, -2.0, 2.0)?;

    if params.max_tokens == Some(0) {
        return Err(GatewayError::validation("max_tokens must be at least 1"));
    }

    if let Some(stop) = &params.stop {
        if stop.len() > MAX_STOP_SEQUENCES {
            return Err(GatewayError::validation(format!(
                "{} stop sequences given, at most {MAX_STOP_SEQUENCES} are allowed",
                stop.len()
            )));
        }
        if stop.iter().any(String::is_empty) {
            return Err(GatewayError::validation("stop sequences must not be empty"));
        }
    }

    Ok(())
}

/// Check a structured-output schema before it is embedded
pub fn validate_schema(spec: &JsonSchemaSpec) -> Result<()> {
    let name = &spec.name;
    if name.is_empty() || name.chars().count() > MAX_SCHEMA_NAME_CHARS {
        return Err(GatewayError::validation(format!(
            "schema name must be 1 to {MAX_SCHEMA_NAME_CHARS} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(GatewayError::validation(format!(
            "schema name `{name}` may only contain letters, digits, `_` and `-`"
        )));
    }
    if !matches!(spec.schema, Value::Object(_)) {
        return Err(GatewayError::validation("schema must be a JSON object"));
    }
    Ok(())
}

fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(GatewayError::validation(format!(
            "{field} must be between {min} and {max}, got {v}"
        ))),
        _ => Ok(()),
    }
}
