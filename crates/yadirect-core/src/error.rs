//! Error types for the yadirect core library
//!
//! Builder-time, engine and extraction failures share one `Error` enum. Fatal
//! responses from the API are carried as an [`ApiError`] so the caller can inspect
//! the exact failing request.

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;

/// Main error type for yadirect operations
#[derive(Error, Debug)]
pub enum Error {
    /// Resource name not present in the catalog
    #[error("Unknown resource: {name}")]
    UnknownResource {
        name: String,
    },

    /// More than one id-list field in SelectionCriteria, cannot decide which to split
    #[error("Ambiguous filter: SelectionCriteria holds several id fields {fields:?}; keep one or disable auto_request_generation")]
    AmbiguousFilter {
        fields: Vec<String>,
    },

    /// Id-list field holds something other than a list
    #[error("Type mismatch: SelectionCriteria.{field} must be a list, got {found}")]
    TypeMismatch {
        field: String,
        found: String,
    },

    /// Fatal response from the API (or a retryable one past its budget)
    #[error(transparent)]
    Api(#[from] ApiError),

    /// One chunk of a fanned-out call failed; the aggregate result is incomplete
    #[error("Chunk {chunk} of {chunks} failed ({completed_pages} pages fetched before): {source}")]
    ChunkFailed {
        chunk: usize,
        chunks: usize,
        completed_pages: usize,
        #[source]
        source: Box<Error>,
    },

    /// The call's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// Method has no entry in the result-key table
    #[error("Unsupported method: no result key configured for '{method}'")]
    UnsupportedMethod {
        method: String,
    },

    /// Resource has no entry in the get result-key table
    #[error("Unsupported resource: no result key configured for '{resource}'")]
    UnsupportedResource {
        resource: String,
    },

    /// Report body could not be interpreted the requested way
    #[error("Report error: {message}")]
    Report {
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Body shape differs from what the operation expects
    #[error("Decode error: {message}")]
    Decode {
        message: String,
    },

    /// HTTP request building errors
    #[error("HTTP request error: {message}")]
    HttpRequest {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Flat classification of every failure the library can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownResource,
    AmbiguousFilter,
    TypeMismatch,
    /// OAuth token missing or invalid (code 53)
    Token,
    /// HTTP 405
    MethodNotSupported,
    /// HTTP 502, report generation took too long
    ServerTimeout,
    /// Any other API error payload
    Client,
    /// Non-success status without an error payload
    Http,
    /// Code 152
    InsufficientUnits,
    /// Codes 56, 506, 9000
    RateLimited,
    /// Codes 52, 1000, 1001, 1002 and bare 500
    TransientServer,
    ConnectionFailure,
    Timeout,
    Cancelled,
    UnsupportedMethod,
    UnsupportedResource,
    Report,
    Configuration,
    Json,
    Decode,
}

impl ErrorKind {
    /// Whether the engine may resend after this kind of failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InsufficientUnits
                | ErrorKind::RateLimited
                | ErrorKind::TransientServer
                | ErrorKind::ConnectionFailure
                | ErrorKind::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnknownResource => "unknown_resource",
            ErrorKind::AmbiguousFilter => "ambiguous_filter",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::Token => "token",
            ErrorKind::MethodNotSupported => "method_not_supported",
            ErrorKind::ServerTimeout => "server_timeout",
            ErrorKind::Client => "client",
            ErrorKind::Http => "http",
            ErrorKind::InsufficientUnits => "insufficient_units",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::TransientServer => "transient_server",
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::UnsupportedMethod => "unsupported_method",
            ErrorKind::UnsupportedResource => "unsupported_resource",
            ErrorKind::Report => "report",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Json => "json",
            ErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Kind of the underlying failure; chunk failures report their source's kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownResource { .. } => ErrorKind::UnknownResource,
            Error::AmbiguousFilter { .. } => ErrorKind::AmbiguousFilter,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Api(api) => api.kind,
            Error::ChunkFailed { source, .. } => source.kind(),
            Error::Cancelled => ErrorKind::Cancelled,
            Error::UnsupportedMethod { .. } => ErrorKind::UnsupportedMethod,
            Error::UnsupportedResource { .. } => ErrorKind::UnsupportedResource,
            Error::Report { .. } => ErrorKind::Report,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Json { .. } => ErrorKind::Json,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::HttpRequest { .. } => ErrorKind::Configuration,
        }
    }

    /// The API error behind this failure, looking through chunk wrappers
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(api),
            Error::ChunkFailed { source, .. } => source.api_error(),
            _ => None,
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Configuration {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownResource {
            name: "campaignz".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown resource: campaignz");
    }

    #[test]
    fn test_kind_looks_through_chunk_failure() {
        let err = Error::ChunkFailed {
            chunk: 2,
            chunks: 3,
            completed_pages: 4,
            source: Box::new(Error::Cancelled),
        };
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.to_string().starts_with("Chunk 2 of 3 failed"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::Token.is_retryable());
        assert!(!ErrorKind::AmbiguousFilter.is_retryable());
    }
}
