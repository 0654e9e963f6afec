//! yadirect Core - Request-execution engine for the Yandex Direct API v5
//!
//! This crate turns logical API calls into HTTP requests, sends them, and handles
//! what the API makes callers deal with: id filters larger than a request may hold,
//! paged results, reports that take a while to build, and rate and unit limits.
//!
//! # Main Components
//!
//! - **Resource Catalog**: resource names and their `json/v5` paths
//! - **Request Builder**: auth, locale and report headers, batch splitting
//! - **Response Classifier**: success, pending report, retryable or fatal
//! - **Retry/Polling Engine**: fixed waits, per-request budgets, cancellation
//! - **Pagination**: lazy `LimitedBy` follow-up pages
//! - **Result Extraction**: result-key tables for JSON methods, TSV reports
//! - **OAuth**: the authorization URL that issues an access token
//!
//! # Example
//!
//! ```no_run
//! use yadirect_core::{ClientConfig, DirectClient, LogicalCall, Resource, Result};
//! use serde_json::json;
//!
//! async fn example() -> Result<()> {
//!     let client = DirectClient::new(ClientConfig::from_env()?.with_receive_all_objects(true))?;
//!     let call = LogicalCall::get(
//!         Resource::Campaigns,
//!         json!({"SelectionCriteria": {}, "FieldNames": ["Id", "Name"]}),
//!     );
//!     let campaigns = client.call(&call).await?.items()?;
//!     println!("{} campaigns", campaigns.len());
//!     Ok(())
//! }
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod oauth;
pub mod observer;
pub mod pagination;
pub mod report;
pub mod resources;
pub mod response;

// Re-export main types for convenience
pub use call::{CallOptions, LogicalCall};
pub use config::{ClientConfig, ProcessingMode, ReportOptions};
pub use error::{Error, ErrorKind, Result};
pub use http::{
    ApiError, DirectClient, DirectClientBuilder, ReportResponse, RequestDescriptor, RetryPolicy,
    Transport,
};
pub use oauth::oauth_authorize_url;
pub use observer::{CallEvent, CallObserver, FnObserver, NoopObserver, TracingObserver};
pub use pagination::{Page, PageStream};
pub use report::Report;
pub use resources::Resource;
pub use response::CallResponse;

pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::Report {
            message: "Test error".to_string(),
        };
        assert!(err.to_string().contains("Test error"));
        assert_eq!(err.kind(), ErrorKind::Report);
    }
}
