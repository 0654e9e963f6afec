//! Transport and response decoding seams
//!
//! The engine talks to the network only through [`Transport`] and turns raw bytes
//! into a [`Body`] only through [`ResponseCodec`]. `ReqwestTransport` and
//! `JsonCodec` are the production implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use serde_json::Value;

use crate::http::builder::RequestDescriptor;
use crate::Result;

/// Failures below the HTTP layer
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request could not be constructed or sent at all
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Connection and timeout failures are worth resending
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }
}

/// Undecoded HTTP response
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Sends one request descriptor and returns whatever the server answered
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> std::result::Result<RawResponse, TransportError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::HttpRequest {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Reuse an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    fn classify_error(error: reqwest::Error) -> TransportError {
        if error.is_builder() {
            TransportError::Request(error.to_string())
        } else if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else {
            TransportError::Connect(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(request.body_string());

        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::Request(format!("invalid header name {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Request(format!("invalid value for header {}: {}", key, e)))?;
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(Self::classify_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(Self::classify_error)?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Text(String),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Text form of the body, for error messages and reports
    pub fn to_text(&self) -> String {
        match self {
            Body::Empty => String::new(),
            Body::Json(value) => value.to_string(),
            Body::Text(text) => text.clone(),
        }
    }
}

/// Turns raw response bytes into a [`Body`]
pub trait ResponseCodec: Send + Sync {
    fn decode(&self, response: &RawResponse) -> Body;
}

/// JSON when it parses as JSON, text otherwise
///
/// Report bodies are TSV; a body is only tried as JSON when the content type says
/// so or it starts like a JSON document, so a one-cell report such as `42` stays text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ResponseCodec for JsonCodec {
    fn decode(&self, response: &RawResponse) -> Body {
        let text = String::from_utf8_lossy(&response.body);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Body::Empty;
        }

        let declared_json = response
            .header("content-type")
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        let looks_json = trimmed.starts_with('{') || trimmed.starts_with('[');

        if declared_json || looks_json {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Body::Json(value);
            }
        }
        Body::Text(text.into_owned())
    }
}

/// Response after decoding, as seen by the classifier and the extractors
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Body,
}

impl Exchange {
    pub fn decode(raw: RawResponse, codec: &dyn ResponseCodec) -> Self {
        let body = codec.decode(&raw);
        Self {
            status: raw.status,
            headers: raw.headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Id the server assigned to the request, if it sent one
    pub fn request_id(&self) -> Option<&str> {
        self.header("requestid")
    }

    /// API units charged, as reported in the `Units` header (`spent/left/limit`)
    pub fn units(&self) -> Option<Units> {
        self.header("units").and_then(Units::parse)
    }
}

/// Parsed `Units` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    pub spent: u64,
    pub remaining: u64,
    pub daily_limit: u64,
}

impl Units {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('/').map(|p| p.trim().parse::<u64>());
        let spent = parts.next()?.ok()?;
        let remaining = parts.next()?.ok()?;
        let daily_limit = parts.next()?.ok()?;
        Some(Self {
            spent,
            remaining,
            daily_limit,
        })
    }
}
