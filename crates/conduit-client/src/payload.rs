use bytes::Bytes;

use crate::error::{GatewayError, Result};
use crate::protocol::{ChatCompletionPayload, JsonSchemaWire, ResponseFormat};
use crate::types::{ChatRequest, JsonSchemaSpec, ModelParams};

/// Overlay per-call params on the client defaults, field by field
pub(crate) fn merge_params(defaults: &ModelParams, overrides: Option<&ModelParams>) -> ModelParams {
    let Some(o) = overrides else {
        return defaults.clone();
    };

    ModelParams {
        temperature: o.temperature.or(defaults.temperature),
        top_p: o.top_p.or(defaults.top_p),
        max_tokens: o.max_tokens.or(defaults.max_tokens),
        presence_penalty: o.presence_penalty.or(defaults.presence_penalty),
        frequency_penalty: o.frequency_penalty.or(defaults.frequency_penalty),
        stop: o.stop.clone().or_else(|| defaults.stop.clone()),
        seed: o.seed.or(defaults.seed),
    }
}

/// Serialize a validated request
///
/// `format` is embedded verbatim as a strict `json_schema` directive.
/// Deterministic: the same inputs always produce the same bytes.
pub(crate) fn build_payload(
    request: &ChatRequest,
    model: &str,
    params: &ModelParams,
    format: Option<&JsonSchemaSpec>,
    stream: bool,
) -> Result<Bytes> {
    let response_format = format.map(|spec| ResponseFormat::JsonSchema {
        json_schema: JsonSchemaWire {
            name: &spec.name,
            strict: spec.strict(),
            schema: &spec.schema,
        },
    });

    let payload = ChatCompletionPayload {
        model,
        messages: &request.messages,
        stream,
        params,
        response_format,
    };

    serde_json::to_vec(&payload)
        .map(Bytes::from)
        .map_err(|e| GatewayError::validation(format!("failed to serialize request: {e}")))
}
