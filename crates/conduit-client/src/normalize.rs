use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, Result, snippet};
use crate::protocol::CompletionBody;
use crate::structured::PARSE_SNIPPET_CHARS;
use crate::types::{ChatResponse, UNKNOWN_MODEL};

/// Map a 2xx non-streaming body onto a [`ChatResponse`]
///
/// A missing model echo is not an error; it becomes [`UNKNOWN_MODEL`].
/// Some providers answer 200 with only an `error` object, which is
/// classified like a status error.
pub(crate) fn normalize(body: &[u8]) -> Result<ChatResponse> {
    let raw: Value = serde_json::from_slice(body).map_err(|e| {
        let text = String::from_utf8_lossy(body);
        GatewayError::parse(format!("provider response is not valid JSON: {e}"))
            .with_details(serde_json::json!({ "snippet": snippet(&text, PARSE_SNIPPET_CHARS) }))
    })?;

    let has_choices = raw
        .get("choices")
        .and_then(Value::as_array)
        .is_some_and(|c| !c.is_empty());
    if let Some(error) = raw.get("error").filter(|e| !e.is_null() && !has_choices) {
        return Err(GatewayError::from_embedded(error));
    }

    let parsed = CompletionBody::deserialize(&raw)
        .map_err(|e| GatewayError::parse(format!("provider response has an unexpected shape: {e}")))?;
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Err(GatewayError::parse("provider response has no choices").with_details(raw));
    };

    Ok(ChatResponse {
        id: parsed.id.unwrap_or_default(),
        model: parsed.model.unwrap_or_else(|| UNKNOWN_MODEL.to_owned()),
        content: choice.message.and_then(|m| m.content).unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: parsed.usage,
        raw,
    })
}
