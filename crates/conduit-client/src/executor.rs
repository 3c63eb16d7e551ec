use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{ErrorKind, GatewayError, Result};
use crate::retry::RetryPolicy;
use crate::scope::{CallScope, millis};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Attribution headers understood by OpenRouter-style gateways
const HTTP_REFERER: HeaderName = HeaderName::from_static("http-referer");
const X_TITLE: HeaderName = HeaderName::from_static("x-title");

/// Issues the POST and owns the retry loop
pub(crate) struct Executor {
    transport: Arc<dyn Transport>,
    endpoint: Url,
    headers: HeaderMap,
    policy: RetryPolicy,
}

impl Executor {
    pub(crate) const fn new(transport: Arc<dyn Transport>, endpoint: Url, headers: HeaderMap, policy: RetryPolicy) -> Self {
        Self {
            transport,
            endpoint,
            headers,
            policy,
        }
    }

    pub(crate) const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `body` until a 2xx arrives or a terminal error is classified
    ///
    /// Retryable failures sleep `policy.backoff_delay(attempt)` and try
    /// again while attempts remain. Every send, error-body read and sleep
    /// runs under `scope`, so the deadline and caller cancellation end the
    /// loop immediately and are never retried.
    pub(crate) async fn execute(&self, body: Bytes, scope: &CallScope) -> Result<HttpResponse> {
        let max_retries = self.policy.max_retries();

        for attempt in 0..=max_retries {
            let request = HttpRequest {
                url: self.endpoint.clone(),
                headers: self.headers.clone(),
                body: body.clone(),
            };

            let error = match scope.guard(self.transport.send(request)).await? {
                Ok(response) if response.status.is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status;
                    let text = scope.guard(response.text()).await?.unwrap_or_default();
                    GatewayError::from_status(status, &text)
                }
                Err(e) => GatewayError::from(e),
            };

            if !error.is_retryable() || attempt >= max_retries {
                return Err(error);
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = max_retries.saturating_add(1),
                kind = error.kind().as_str(),
                status = error.http_status(),
                delay_ms = millis(delay),
                remaining_ms = millis(scope.remaining()),
                "gateway request failed, retrying"
            );

            scope.guard(tokio::time::sleep(delay)).await?;
        }

        Err(GatewayError::new(ErrorKind::ServerError, "max retries exceeded"))
    }
}

/// Headers sent on every attempt
///
/// Built once at client construction so a malformed key or attribution
/// value fails there, not on the first call.
pub(crate) fn default_headers(api_key: &SecretString, app_title: Option<&str>, site_url: Option<&str>) -> Result<HeaderMap> {
    let key = api_key.expose_secret().trim();
    if key.is_empty() {
        return Err(GatewayError::new(ErrorKind::Authorization, "api key is empty"));
    }

    let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|_| GatewayError::new(ErrorKind::Authorization, "api key contains characters not allowed in a header"))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(site_url) = site_url {
        headers.insert(HTTP_REFERER, attribution_value("site_url", site_url)?);
    }
    if let Some(app_title) = app_title {
        headers.insert(X_TITLE, attribution_value("app_title", app_title)?);
    }

    Ok(headers)
}

fn attribution_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::validation(format!("{field} contains characters not allowed in a header")))
}
