//! The network seam under the executor.
//!
//! [`Transport`] sends one fully-formed [`OutboundRequest`] and returns the
//! status and complete body, or a [`TransportError`] saying whether the
//! failure is worth another attempt. [`ReqwestTransport`] is the production
//! implementation; tests plug in their own to count attempts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::debug;
use url::Url;

use super::request::Method;
use crate::config::ClientConfig;
use crate::error::LabsError;

/// A file part ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Request body as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundBody {
    Empty,
    /// `application/x-www-form-urlencoded` text.
    Form(String),
    /// Text fields plus one file part.
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

/// One request exactly as it will be sent; reused across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: OutboundBody,
}

impl OutboundRequest {
    /// First header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and full body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Why no response was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connect, DNS, timeout or body read failure. Worth another attempt.
    Transient { message: String },

    /// The request itself is unusable (bad header value, bad URL). Retrying
    /// would fail the same way.
    Request { message: String },
}

impl TransportError {
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }
}

/// Sends a single request attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport carrying proxies, TLS policy and timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds the HTTP client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LabsError::Config`] for an unusable proxy URL or when the
    /// client cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> Result<Self, LabsError> {
        let mut builder = base_client_builder(config.connect_timeout, config.request_timeout);

        for (scheme, proxy_url) in &config.proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(proxy_url.as_str()),
                "https" => Proxy::https(proxy_url.as_str()),
                _ => Proxy::all(proxy_url.as_str()),
            }
            .map_err(|e| LabsError::config(format!("invalid proxy URL '{proxy_url}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        if !config.verify_tls {
            debug!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| LabsError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn base_client_builder(connect_timeout: Duration, request_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .gzip(true)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            OutboundBody::Empty => builder,
            OutboundBody::Form(encoded) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded.clone()),
            OutboundBody::Multipart { fields, file } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                builder.multipart(form.part(file.field.clone(), part))
            }
        };

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::transient(format!("failed reading response body: {e}")))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn classify_send_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::request(error.to_string())
    } else {
        TransportError::transient(error.to_string())
    }
}
