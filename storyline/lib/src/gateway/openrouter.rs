//! OpenRouter chat-completions client.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, instrument, warn};

use super::ChatCompletion;
use super::error::GatewayError;
use super::types::{ChatRequestBody, ChatResponseBody, CompletionRequest, ErrorEnvelope};

/// OpenRouter's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Longest slice of a provider body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// [`ChatCompletion`] backed by OpenRouter's `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenRouterGateway {
    api_key: String,
    base_url: String,
    http: Client,
    app_name: Option<String>,
    site_url: Option<String>,
}

impl fmt::Debug for OpenRouterGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterGateway")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("app_name", &self.app_name)
            .field("site_url", &self.site_url)
            .finish()
    }
}

impl OpenRouterGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
            app_name: None,
            site_url: None,
        }
    }

    /// Point the client at another OpenAI-compatible root (no trailing slash needed).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sent as `X-Title` for attribution on the OpenRouter dashboard.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sent as `HTTP-Referer` for attribution on the OpenRouter dashboard.
    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn attribution_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(ref url) = self.site_url
            && let Ok(val) = HeaderValue::from_str(url)
        {
            headers.insert("HTTP-Referer", val);
        }

        if let Some(ref name) = self.app_name
            && let Ok(val) = HeaderValue::from_str(name)
        {
            headers.insert("X-Title", val);
        }

        headers
    }
}

impl ChatCompletion for OpenRouterGateway {
    #[instrument(skip(self, request), fields(model = %request.model, timeout_secs = request.timeout.as_secs()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(messages = request.messages.len(), temperature = request.temperature, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .headers(self.attribution_headers())
            .timeout(request.timeout)
            .json(&ChatRequestBody::from(request))
            .send()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;

        let result = if status.is_success() {
            parse_success_body(&body)
        } else {
            Err(status_error(status, &body))
        };

        match &result {
            Ok(content) => debug!(content_len = content.len(), "Chat completion succeeded"),
            Err(e @ GatewayError::MalformedResponse { .. }) => {
                warn!(error = %e, body = %truncate(&body), "Chat completion returned no content")
            }
            Err(e) => warn!(kind = %e.kind(), error = %e, "Chat completion failed"),
        }

        result
    }
}

/// Classify a failure that happened before a complete body was read.
fn transport_error(e: reqwest::Error, timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        let secs = whole_secs_rounded_up(timeout);
        warn!(timeout_secs = secs, "Chat completion timed out");
        return GatewayError::Timeout { secs };
    }

    error!(error = ?e, "Unexpected transport failure calling chat completion");
    GatewayError::Unknown {
        detail: e.to_string(),
    }
}

/// Map a non-2xx response to a rate-limit or service error.
fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| fallback_message(status, body));

    if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::RateLimited { message }
    } else {
        GatewayError::ServiceError {
            status: status.as_u16(),
            message,
        }
    }
}

/// Extract `choices[0].message.content` from a 2xx body.
///
/// OpenRouter occasionally reports upstream failures inside a 200 response as
/// an `error` object with no choices; those are classified by their code.
fn parse_success_body(body: &str) -> Result<String, GatewayError> {
    let parsed: ChatResponseBody =
        serde_json::from_str(body).map_err(|e| GatewayError::MalformedResponse {
            detail: format!("response body is not a chat completion: {}", e),
        })?;

    if parsed.choices.is_empty()
        && let Some(api_error) = parsed.error
    {
        let code = api_error.numeric_code();
        let message = api_error
            .message
            .unwrap_or_else(|| "provider returned an error".to_string());
        return Err(match code {
            Some(429) => GatewayError::RateLimited { message },
            Some(status) => GatewayError::ServiceError { status, message },
            None => GatewayError::ServiceError {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message,
            },
        });
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| GatewayError::MalformedResponse {
            detail: "missing choices[0].message.content".to_string(),
        })
}

/// Never reports a sub-second timeout as zero seconds.
fn whole_secs_rounded_up(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no error message")
            .to_string()
    } else {
        truncate(trimmed)
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
