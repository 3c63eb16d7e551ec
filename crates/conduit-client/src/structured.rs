use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{GatewayError, Result, snippet};
use crate::types::{ChatJsonResponse, ChatResponse};

/// Most characters of offending content carried by a `Parse` error
pub const PARSE_SNIPPET_CHARS: usize = 500;

/// Decode `response.content` as `T`
///
/// Schema conformance is the provider's job in strict mode; the only check
/// here is that the text is JSON and fits `T`. Failures carry a bounded
/// snippet, never the whole content.
pub(crate) fn decode_json<T: DeserializeOwned>(response: ChatResponse) -> Result<ChatJsonResponse<T>> {
    let parsed = serde_json::from_str::<Value>(&response.content)
        .and_then(T::deserialize)
        .map_err(|e| {
            GatewayError::parse(format!("model output is not the requested JSON: {e}")).with_details(json!({
                "snippet": snippet(&response.content, PARSE_SNIPPET_CHARS),
                "content_chars": response.content.chars().count(),
            }))
        })?;

    Ok(ChatJsonResponse { parsed, raw: response })
}
