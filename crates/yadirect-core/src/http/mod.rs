//! HTTP layer for Yandex Direct API communication
//!
//! This module provides:
//! - Request building from logical calls, with batch splitting and report naming
//! - Response classification into success, pending, retryable and fatal outcomes
//! - Fixed-delay retry and report polling with cancellation
//! - Pluggable transport and response decoding

pub mod builder;
pub mod classifier;
pub mod client;
pub mod error;
pub mod retry;
pub mod transport;

pub use builder::{RequestBuilder, RequestDescriptor, MAX_IDS_PER_REQUEST};
pub use classifier::{classify, ResponseOutcome};
pub use client::{Delivery, DirectClient, DirectClientBuilder, ReportResponse};
pub use error::{ApiError, ErrorPayload, RequestContext};
pub use retry::{RetryDecision, RetryHandler, RetryPolicy};
pub use transport::{
    Body, Exchange, JsonCodec, RawResponse, ReqwestTransport, ResponseCodec, Transport,
    TransportError, Units,
};

// Re-export commonly used types
pub use reqwest::Method;
