//! Logical calls: one caller intent, before it is turned into HTTP requests

use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::config::ProcessingMode;
use crate::resources::Resource;

/// Per-call overrides of [`ClientConfig`](crate::ClientConfig) fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub login: Option<String>,
    pub language: Option<String>,
    pub use_operator_units: Option<bool>,
    pub auto_request_generation: Option<bool>,
    pub receive_all_objects: Option<bool>,
    pub retry_if_not_enough_units: Option<bool>,
    pub retry_if_exceeded_limit: Option<bool>,
    pub retries_if_server_error: Option<u32>,
    pub wait_report: Option<bool>,
    pub processing_mode: Option<ProcessingMode>,
    pub return_money_in_micros: Option<bool>,
    pub skip_report_header: Option<bool>,
    pub skip_column_header: Option<bool>,
    pub skip_report_summary: Option<bool>,
    /// Sent after every computed header, so they win on conflict
    pub headers: BTreeMap<String, String>,
}

/// One API call as the caller expressed it
#[derive(Debug, Clone)]
pub struct LogicalCall {
    resource: Resource,
    http_method: Method,
    body: Value,
    options: CallOptions,
    cancel: CancellationToken,
}

impl LogicalCall {
    /// Call with a ready-made `{method, params}` body
    pub fn new(resource: Resource, body: Value) -> Self {
        Self {
            resource,
            http_method: Method::POST,
            body,
            options: CallOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// `{"method": api_method, "params": params}`
    pub fn method(resource: Resource, api_method: &str, params: Value) -> Self {
        Self::new(resource, json!({ "method": api_method, "params": params }))
    }

    pub fn get(resource: Resource, params: Value) -> Self {
        Self::method(resource, "get", params)
    }

    /// Report request; the reports resource takes `params` only
    pub fn report(params: Value) -> Self {
        Self::new(Resource::Reports, json!({ "params": params }))
    }

    pub fn with_http_method(mut self, method: Method) -> Self {
        self.http_method = method;
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Cancelling `token` aborts any send or wait of this call
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn http_method(&self) -> &Method {
        &self.http_method
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The `method` field of the body, e.g. `get` or `add`
    pub fn api_method(&self) -> Option<&str> {
        self.body.get("method").and_then(Value::as_str)
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
