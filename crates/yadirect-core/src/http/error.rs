//! API error payloads and the fatal-response error type
//!
//! The server reports failures as `{"error": {"error_code", "request_id",
//! "error_string", "error_detail"}}`, sometimes with a 200 status. [`ErrorPayload`]
//! is that object; [`ApiError`] is what the engine returns once it gives up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::builder::RequestDescriptor;
use crate::http::transport::{Exchange, TransportError};
use crate::ErrorKind;

/// Error object from a response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error_code: i64,
    pub request_id: Option<String>,
    pub error_string: Option<String>,
    pub error_detail: Option<String>,
}

impl ErrorPayload {
    /// Read the `error` object of a body, if it carries one
    ///
    /// `error_code` arrives either as a number or as a numeric string. A missing or
    /// unparseable code reads as 0, which matches no known code.
    pub fn from_body(body: &Value) -> Option<Self> {
        let error = body.get("error")?.as_object()?;
        let error_code = match error.get("error_code") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        let text = |key: &str| {
            error.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
        };
        Some(Self {
            error_code,
            request_id: text("request_id"),
            error_string: text("error_string"),
            error_detail: text("error_detail"),
        })
    }

    /// Human-readable message built from the string and detail fields
    pub fn message(&self) -> String {
        match (&self.error_string, &self.error_detail) {
            (Some(s), Some(d)) if !d.is_empty() => format!("{}: {}", s, d),
            (Some(s), _) => s.clone(),
            (None, Some(d)) => d.clone(),
            (None, None) => format!("error code {}", self.error_code),
        }
    }
}

/// The request that produced a failure
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub url: String,
    pub body: Value,
    pub chunk: usize,
}

impl From<&RequestDescriptor> for RequestContext {
    fn from(request: &RequestDescriptor) -> Self {
        Self {
            url: request.url.clone(),
            body: request.body.clone(),
            chunk: request.chunk,
        }
    }
}

/// Fatal failure of one request
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error{}: {message}", status_suffix(.status_code))]
pub struct ApiError {
    pub kind: ErrorKind,
    /// None for network failures
    pub status_code: Option<u16>,
    pub message: String,
    pub payload: Option<ErrorPayload>,
    pub headers: HashMap<String, String>,
    /// Raw body text, for payload-less failures
    pub body_text: String,
    pub request: Option<RequestContext>,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
            payload: None,
            headers: HashMap::new(),
            body_text: String::new(),
            request: None,
        }
    }

    /// Build from a response the classifier judged fatal
    pub fn from_exchange(kind: ErrorKind, exchange: &Exchange) -> Self {
        let payload = exchange.body.as_json().and_then(ErrorPayload::from_body);
        let body_text = exchange.body.to_text();
        let message = match &payload {
            Some(p) => {
                let mut message = format!("[{}] {}", p.error_code, p.message());
                if let Some(id) = &p.request_id {
                    message.push_str(&format!(" (request_id {})", id));
                }
                message
            }
            None if body_text.trim().is_empty() => format!("HTTP status {}", exchange.status),
            None => body_text.trim().to_string(),
        };

        Self {
            kind,
            status_code: Some(exchange.status),
            message,
            payload,
            headers: exchange.headers.clone(),
            body_text,
            request: None,
        }
    }

    /// Build from a failure below the HTTP layer
    pub fn from_transport(error: &TransportError) -> Self {
        let kind = match error {
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connect(_) => ErrorKind::ConnectionFailure,
            TransportError::Request(_) => ErrorKind::Http,
        };
        Self::new(kind, error.to_string())
    }

    pub fn with_request(mut self, request: &RequestDescriptor) -> Self {
        self.request = Some(RequestContext::from(request));
        self
    }

    /// Server error code, when the body carried one
    pub fn error_code(&self) -> Option<i64> {
        self.payload.as_ref().map(|p| p.error_code)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.request_id.as_deref())
            .or_else(|| self.headers.get("requestid").map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{JsonCodec, RawResponse};
    use serde_json::json;

    #[test]
    fn test_payload_numeric_string_code() {
        let body = json!({"error": {"error_code": "53", "request_id": "r1", "error_string": "Authorization error"}});
        let payload = ErrorPayload::from_body(&body).unwrap();
        assert_eq!(payload.error_code, 53);
        assert_eq!(payload.request_id.as_deref(), Some("r1"));
        assert_eq!(payload.message(), "Authorization error");
    }

    #[test]
    fn test_payload_absent() {
        assert!(ErrorPayload::from_body(&json!({"result": {}})).is_none());
        assert!(ErrorPayload::from_body(&json!({"error": "text"})).is_none());
    }

    #[test]
    fn test_payload_without_usable_code() {
        let garbled = ErrorPayload::from_body(&json!({"error": {"error_code": "abc"}})).unwrap();
        assert_eq!(garbled.error_code, 0);

        let missing = ErrorPayload::from_body(&json!({"error": {"error_string": "Invalid request"}})).unwrap();
        assert_eq!(missing.error_code, 0);
        assert_eq!(missing.message(), "Invalid request");
    }

    #[test]
    fn test_from_exchange_with_payload() {
        let raw = RawResponse::new(
            200,
            r#"{"error":{"error_code":8000,"request_id":"42","error_string":"Invalid request","error_detail":"Field missing"}}"#,
        );
        let exchange = Exchange::decode(raw, &JsonCodec);
        let err = ApiError::from_exchange(ErrorKind::Client, &exchange);

        assert_eq!(err.error_code(), Some(8000));
        assert_eq!(err.request_id(), Some("42"));
        assert_eq!(err.status_code, Some(200));
        assert!(err.message.contains("Invalid request: Field missing"));
        assert!(err.to_string().starts_with("client error (HTTP 200)"));
    }

    #[test]
    fn test_from_exchange_bare_status() {
        let exchange = Exchange::decode(RawResponse::new(404, ""), &JsonCodec);
        let err = ApiError::from_exchange(ErrorKind::Http, &exchange);
        assert_eq!(err.message, "HTTP status 404");
        assert!(err.payload.is_none());
    }

    #[test]
    fn test_from_transport() {
        let err = ApiError::from_transport(&TransportError::Timeout("30s".to_string()));
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.status_code, None);
    }
}
