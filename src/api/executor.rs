//! Resilient request execution and response classification.
//!
//! [`Executor::execute`] turns a [`RequestSpec`] into an [`OutboundRequest`],
//! sends it through the [`Transport`] with jittered exponential backoff over
//! transport failures, then [`classify`]s the response:
//!
//! | Response | Result |
//! |----------|--------|
//! | 200, raw requested | [`ApiPayload::Raw`] |
//! | 200, `success: true` | [`ApiPayload::Json`] of `data` |
//! | 200, `success: false` | [`LabsError::ApiLevel`] |
//! | 200, not an envelope | [`LabsError::Decode`] |
//! | anything else | [`LabsError::HttpLevel`] |
//!
//! HTTP responses are never retried, whatever their status.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;
use url::form_urlencoded;

use super::request::{Method, RequestSpec};
use super::retry::{BackoffPolicy, RetryDecision};
use super::transport::{
    FilePart, OutboundBody, OutboundRequest, ReqwestTransport, Transport, TransportError,
    TransportResponse,
};
use crate::config::ClientConfig;
use crate::error::LabsError;

/// Header value identifying this client.
#[must_use]
pub fn user_agent() -> String {
    format!("inquestlabs-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// Authorization header value for an API key.
///
/// The API expects the literal `Basic: <key>` (scheme label with a colon, key
/// not base64-encoded); this is not RFC 7617 basic auth.
#[must_use]
pub fn authorization_value(api_key: &str) -> String {
    format!("Basic: {api_key}")
}

/// Decoded payload of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// `data` member of the envelope.
    Json(Value),
    /// Raw body, when raw mode was requested.
    Raw(Vec<u8>),
}

impl ApiPayload {
    /// JSON view of the payload. Raw bodies become a (lossy UTF-8) string.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Raw(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }

    /// Byte view of the payload. JSON payloads are serialized.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Raw(bytes) => bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<Value>,
}

/// Sends requests to one API endpoint with a fixed credential and retry budget.
#[derive(Clone)]
pub struct Executor {
    base_url: String,
    api_key: Option<String>,
    policy: BackoffPolicy,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor over an arbitrary transport.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        policy: BackoffPolicy,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            policy,
            transport,
        }
    }

    /// Creates an executor with the reqwest transport described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::Config`] when the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, api_key: Option<String>) -> Result<Self, LabsError> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(
            config.base_url.clone(),
            api_key,
            BackoffPolicy::with_max_attempts(config.retry_budget),
            Arc::new(transport),
        ))
    }

    /// Full URL for an endpoint suffix.
    #[must_use]
    pub fn endpoint(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.base_url)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    /// Retry policy applied to every request.
    #[must_use]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Executes `spec`, retrying transport failures, and classifies the response.
    ///
    /// # Errors
    ///
    /// - [`LabsError::Request`] when the URL cannot be built or the transport
    ///   rejects the request outright (never retried).
    /// - [`LabsError::Io`] when an attached file cannot be read.
    /// - [`LabsError::ExhaustedRetries`] after `max_attempts` transport failures.
    /// - [`LabsError::ApiLevel`], [`LabsError::HttpLevel`], [`LabsError::Decode`]
    ///   per [`classify`].
    #[instrument(skip(self, spec), fields(endpoint = %spec.endpoint(), method = %spec.method()))]
    pub async fn execute(&self, spec: &RequestSpec, raw: bool) -> Result<ApiPayload, LabsError> {
        let endpoint = self.endpoint(spec.endpoint());
        let request = self.build_request(&endpoint, spec).await?;

        let response = self.send_with_retry(&endpoint, &request).await?;
        debug!(status = response.status, bytes = response.body.len(), "response received");

        classify(&endpoint, response.status, &response.body, raw)
    }

    async fn send_with_retry(
        &self,
        endpoint: &str,
        request: &OutboundRequest,
    ) -> Result<TransportResponse, LabsError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.transport.send(request).await {
                Ok(response) => return Ok(response),
                Err(TransportError::Request { message }) => {
                    return Err(LabsError::request(endpoint, message));
                }
                Err(TransportError::Transient { message }) => {
                    match self.policy.should_retry(attempt) {
                        RetryDecision::Retry { delay, attempt: next } => {
                            warn!(
                                attempt,
                                next_attempt = next,
                                delay_ms = delay.as_millis(),
                                error = %message,
                                "transport failure, backing off"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(attempt, %reason, "giving up");
                            return Err(LabsError::exhausted_retries(endpoint, attempt, message));
                        }
                    }
                }
            }
        }
    }

    async fn build_request(
        &self,
        endpoint: &str,
        spec: &RequestSpec,
    ) -> Result<OutboundRequest, LabsError> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| LabsError::request(endpoint, format!("invalid URL: {e}")))?;
        let fields = spec.rendered_fields();

        let body = match (spec.method(), spec.file_attachment()) {
            (_, Some(attachment)) => OutboundBody::Multipart {
                fields,
                file: read_file_part(&attachment.field, &attachment.path).await?,
            },
            (Method::Get, None) => {
                if !fields.is_empty() {
                    url.query_pairs_mut().extend_pairs(fields.iter());
                }
                OutboundBody::Empty
            }
            (Method::Post, None) if fields.is_empty() => OutboundBody::Empty,
            (Method::Post, None) => OutboundBody::Form(
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish(),
            ),
        };

        Ok(OutboundRequest {
            method: spec.method(),
            url,
            headers: self.headers(),
            body,
        })
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("User-Agent".to_string(), user_agent())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), authorization_value(key)));
        }
        headers
    }
}

async fn read_file_part(field: &str, path: &Path) -> Result<FilePart, LabsError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LabsError::io(path, e))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
    Ok(FilePart {
        field: field.to_string(),
        file_name,
        bytes,
    })
}

/// Classifies a received response.
///
/// # Errors
///
/// See the module table.
pub fn classify(endpoint: &str, status: u16, body: &[u8], raw: bool) -> Result<ApiPayload, LabsError> {
    if status != 200 {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.error)
            .map_or_else(|| "n/a".to_string(), render_error);
        return Err(LabsError::http_level(status, endpoint, message));
    }

    if raw {
        return Ok(ApiPayload::Raw(body.to_vec()));
    }

    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| LabsError::decode(endpoint, e))?;

    if envelope.success {
        Ok(ApiPayload::Json(envelope.data))
    } else {
        let message = envelope.error.map_or_else(|| "n/a".to_string(), render_error);
        Err(LabsError::api_level(endpoint, message))
    }
}

fn render_error(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => "n/a".to_string(),
        other => other.to_string(),
    }
}
