use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use conduit_config::GatewayConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::error::{GatewayError, Result};
use crate::executor::{Executor, default_headers};
use crate::normalize::normalize;
use crate::payload::{build_payload, merge_params};
use crate::retry::RetryPolicy;
use crate::scope::{CallScope, millis};
use crate::sse::{self, StreamHandler};
use crate::structured::decode_json;
use crate::transport::{HttpTransport, Transport};
use crate::types::{ChatJsonResponse, ChatRequest, ChatResponse, JsonSchemaSpec, ModelParams};
use crate::validate::{validate_params, validate_request, validate_schema};

/// Used when the configuration does not name a base URL
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Path appended to the base URL
const COMPLETIONS_PATH: &str = "chat/completions";

/// Outbound client for an OpenAI-compatible chat completion API
///
/// Cheap to share behind an `Arc`: calls take `&self` and keep no state
/// between them. Each call gets a fresh deadline of `timeout`, armed when
/// the call starts and covering every retry.
pub struct GatewayClient {
    executor: Executor,
    default_model: Option<String>,
    default_params: ModelParams,
    timeout: Duration,
}

impl GatewayClient {
    /// Build a client backed by the pooled reqwest transport
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client over a caller-supplied transport
    ///
    /// Applies the construction guards: a non-empty API key, a positive
    /// timeout, `base_delay <= max_delay`, valid attribution headers and
    /// in-range default params.
    pub fn with_transport(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let headers = default_headers(&config.api_key, config.app_title.as_deref(), config.site_url.as_deref())?;

        if config.timeout.is_zero() {
            return Err(GatewayError::validation("timeout must be greater than zero"));
        }

        let policy = RetryPolicy::try_from(&config.retry)?;
        let endpoint = completions_endpoint(config.base_url.as_ref())?;

        let default_params = ModelParams::from(&config.defaults);
        validate_params(&default_params)?;

        let default_model = trimmed_model(config.default_model.as_deref());

        tracing::debug!(
            endpoint = %endpoint,
            default_model = default_model.as_deref(),
            timeout_ms = millis(config.timeout),
            max_retries = policy.max_retries(),
            "gateway client configured"
        );

        Ok(Self {
            executor: Executor::new(transport, endpoint, headers, policy),
            default_model,
            default_params,
            timeout: config.timeout,
        })
    }

    /// Replace the default model and params
    ///
    /// The model is trimmed, and a blank one clears the default, as at
    /// construction. Taking `&mut self` means no call can be in flight on
    /// this instance. A client already shared behind an `Arc` has to be
    /// rebuilt instead.
    pub fn set_defaults(&mut self, model: Option<String>, params: ModelParams) -> Result<()> {
        validate_params(&params)?;

        self.default_model = trimmed_model(model.as_deref());
        self.default_params = params;
        Ok(())
    }

    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    pub const fn default_params(&self) -> &ModelParams {
        &self.default_params
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub const fn endpoint(&self) -> &Url {
        self.executor.endpoint()
    }

    /// Non-streaming chat
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let started = Instant::now();
        tracing::debug!(operation = "chat", messages = request.messages.len(), "gateway call started");

        let result = self.complete(request, request.response_format.as_ref()).await;
        record("chat", started, result.as_ref());
        result
    }

    /// Non-streaming chat whose answer must be JSON matching `schema`
    ///
    /// The schema is sent in strict structured-output mode and the answer
    /// is decoded into `T`.
    pub async fn chat_json<T>(&self, request: &ChatRequest, schema_name: &str, schema: Value) -> Result<ChatJsonResponse<T>>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        tracing::debug!(
            operation = "chat_json",
            messages = request.messages.len(),
            schema = schema_name,
            "gateway call started"
        );

        let spec = JsonSchemaSpec::new(schema_name, schema);
        let result = match self.complete(request, Some(&spec)).await {
            Ok(response) => decode_json(response),
            Err(e) => Err(e),
        };

        record("chat_json", started, result.as_ref().map(|r| &r.raw));
        result
    }

    /// Streaming chat
    ///
    /// Deltas go to `handler.on_chunk` as they arrive. The call then ends
    /// with exactly one `on_complete` or `on_error`, including for
    /// validation failures that never reach the network.
    pub async fn chat_stream<H>(&self, request: &ChatRequest, handler: &mut H)
    where
        H: StreamHandler + ?Sized,
    {
        let started = Instant::now();
        tracing::debug!(operation = "chat_stream", messages = request.messages.len(), "gateway call started");

        let outcome = self.stream(request, |delta| handler.on_chunk(delta)).await;
        record("chat_stream", started, outcome.as_ref());

        match outcome {
            Ok(response) => handler.on_complete(response),
            Err(e) => handler.on_error(e),
        }
    }

    async fn complete(&self, request: &ChatRequest, format: Option<&JsonSchemaSpec>) -> Result<ChatResponse> {
        let body = self.prepare(request, format, false)?;
        let scope = CallScope::start(self.timeout, request.signal.as_ref());

        let response = self.executor.execute(body, &scope).await?;
        let bytes = scope.guard(response.bytes()).await??;
        normalize(&bytes)
    }

    async fn stream<F>(&self, request: &ChatRequest, on_delta: F) -> Result<ChatResponse>
    where
        F: FnMut(&str),
    {
        let body = self.prepare(request, request.response_format.as_ref(), true)?;
        let scope = CallScope::start(self.timeout, request.signal.as_ref());

        let response = self.executor.execute(body, &scope).await?;
        sse::decode(response.body, &scope, on_delta).await
    }

    /// Validate, merge defaults and serialize; no I/O
    fn prepare(&self, request: &ChatRequest, format: Option<&JsonSchemaSpec>, stream: bool) -> Result<Bytes> {
        let model = validate_request(request, self.default_model.as_deref())?;

        let params = merge_params(&self.default_params, request.params.as_ref());
        validate_params(&params)?;

        if let Some(spec) = format {
            validate_schema(spec)?;
        }

        build_payload(request, model, &params, format, stream)
    }
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("endpoint", &self.executor.endpoint().as_str())
            .field("default_model", &self.default_model)
            .field("default_params", &self.default_params)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Trimmed default model; blank means none
fn trimmed_model(model: Option<&str>) -> Option<String> {
    model.map(str::trim).filter(|m| !m.is_empty()).map(str::to_owned)
}

fn completions_endpoint(base_url: Option<&Url>) -> Result<Url> {
    let base = base_url.map_or(DEFAULT_BASE_URL, Url::as_str);
    let joined = format!("{}/{COMPLETIONS_PATH}", base.trim_end_matches('/'));

    Url::parse(&joined).map_err(|e| GatewayError::validation(format!("invalid base url `{base}`: {e}")))
}

/// Log the outcome of one public call
fn record(operation: &'static str, started: Instant, outcome: std::result::Result<&ChatResponse, &GatewayError>) {
    let duration_ms = millis(started.elapsed());

    match outcome {
        Ok(response) => tracing::info!(
            operation,
            model = %response.model,
            finish_reason = response.finish_reason.as_deref(),
            duration_ms,
            "gateway call succeeded"
        ),
        Err(e) => tracing::warn!(
            operation,
            kind = e.kind().as_str(),
            status = e.http_status(),
            cancelled = e.is_cancelled(),
            duration_ms,
            error = %e.message(),
            "gateway call failed"
        ),
    }
}
