//! HTTP request builder for Yandex Direct API calls
//!
//! Turns a [`LogicalCall`] into one or more [`RequestDescriptor`]s: resolves the
//! url, applies auth, locale and report headers, names anonymous reports and splits
//! oversized id filters into bounded chunks.

use std::collections::BTreeMap;

use reqwest::Method;
use url::Url;
use serde_json::{Map, Value};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::call::LogicalCall;
use crate::config::ClientConfig;
use crate::resources::Resource;
use crate::{Error, Result};

/// Largest id list the server accepts per SelectionCriteria field
pub const MAX_IDS_PER_REQUEST: [(&str, usize); 9] = [
    ("Ids", 10_000),
    ("KeywordIds", 10_000),
    ("RetargetingListIds", 1_000),
    ("InterestIds", 1_000),
    ("AdGroupIds", 1_000),
    ("AdIds", 1_000),
    ("CampaignIds", 10),
    ("AccountIDS", 100),
    ("Logins", 50),
];

/// Batch limit for an id-list field, if it has one
pub fn max_batch_size(field: &str) -> Option<usize> {
    MAX_IDS_PER_REQUEST
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, size)| *size)
}

/// One concrete HTTP exchange, ready to hand to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub resource: Resource,
    /// Position within the fan-out of its logical call
    pub chunk: usize,
}

impl RequestDescriptor {
    pub fn body_string(&self) -> String {
        self.body.to_string()
    }

    pub fn api_method(&self) -> Option<&str> {
        self.body.get("method").and_then(Value::as_str)
    }

    pub fn selection_criteria(&self) -> Option<&Map<String, Value>> {
        self.body
            .get("params")
            .and_then(|p| p.get("SelectionCriteria"))
            .and_then(Value::as_object)
    }

    pub fn page_offset(&self) -> Option<u64> {
        self.body
            .get("params")
            .and_then(|p| p.get("Page"))
            .and_then(|p| p.get("Offset"))
            .and_then(Value::as_u64)
    }

    /// Copy of this request asking for the page that starts at `offset`
    ///
    /// Any existing `Page` fields such as `Limit` are kept.
    pub fn with_page_offset(&self, offset: u64) -> Self {
        let mut next = self.clone();
        if let Some(params) = next.body.get_mut("params").and_then(Value::as_object_mut) {
            let page = params
                .entry("Page")
                .or_insert_with(|| Value::Object(Map::new()));
            if !page.is_object() {
                *page = Value::Object(Map::new());
            }
            if let Some(page) = page.as_object_mut() {
                page.insert("Offset".to_string(), Value::from(offset));
            }
        }
        next
    }
}

/// Builder for request descriptors under one effective configuration
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    api_root: String,
    config: ClientConfig,
}

impl RequestBuilder {
    /// Create a builder from the effective (per-call) configuration
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            api_root: config.api_root(),
            config: config.clone(),
        }
    }

    /// Build every request needed to carry out `call`
    pub fn build(&self, call: &LogicalCall) -> Result<Vec<RequestDescriptor>> {
        let resource = call.resource();
        let url = self.build_url(resource)?;
        let headers = self.build_headers(resource, &call.options().headers);

        let mut body = call.body().clone();
        if resource.is_report() {
            ensure_report_name(&mut body, &headers);
        }

        let bodies = if self.config.auto_request_generation && !resource.is_report() {
            split_selection(body)?
        } else {
            vec![body]
        };

        if bodies.len() > 1 {
            debug!(
                resource = %resource,
                chunks = bodies.len(),
                "split id filter into several requests"
            );
        }

        Ok(bodies
            .into_iter()
            .enumerate()
            .map(|(chunk, body)| RequestDescriptor {
                method: call.http_method().clone(),
                url: url.clone(),
                headers: headers.clone(),
                body,
                resource,
                chunk,
            })
            .collect())
    }

    /// Build the full URL from the api root and the resource path
    fn build_url(&self, resource: Resource) -> Result<String> {
        let base = Url::parse(&self.api_root).map_err(|e| Error::HttpRequest {
            message: format!("Invalid api root: {}", self.api_root),
            source: Some(Box::new(e)),
        })?;

        base.join(&resource.path())
            .map(String::from)
            .map_err(|e| Error::HttpRequest {
                message: format!("Failed to join path: {}", resource.path()),
                source: Some(Box::new(e)),
            })
    }

    fn build_headers(
        &self,
        resource: Resource,
        extra: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let config = &self.config;
        let mut headers = BTreeMap::new();

        if let Some(token) = &config.access_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        if let Some(login) = &config.login {
            headers.insert("Client-Login".to_string(), login.clone());
        }
        if config.use_operator_units {
            headers.insert("Use-Operator-Units".to_string(), "true".to_string());
        }
        headers.insert("Accept-Language".to_string(), config.language.clone());

        if resource.is_report() {
            let report = &config.report;
            headers.insert(
                "processingMode".to_string(),
                report.processing_mode.as_str().to_string(),
            );
            headers.insert(
                "returnMoneyInMicros".to_string(),
                report.return_money_in_micros.to_string(),
            );
            headers.insert(
                "skipReportHeader".to_string(),
                report.skip_report_header.to_string(),
            );
            headers.insert(
                "skipColumnHeader".to_string(),
                report.skip_column_header.to_string(),
            );
            headers.insert(
                "skipReportSummary".to_string(),
                report.skip_report_summary.to_string(),
            );
        }

        for (key, value) in extra {
            headers.insert(key.clone(), value.clone());
        }
        headers
    }
}

/// Give an unnamed report a name derived from what it asks for
///
/// Identical requests get the same name, so the server can hand back a report it
/// already built; different requests never share one.
fn ensure_report_name(body: &mut Value, headers: &BTreeMap<String, String>) {
    let Some(params) = body.get_mut("params").and_then(Value::as_object_mut) else {
        return;
    };
    let named = params
        .get("ReportName")
        .map(|name| match name {
            Value::String(s) => !s.trim().is_empty(),
            Value::Null => false,
            _ => true,
        })
        .unwrap_or(false);
    if named {
        return;
    }

    let identity: BTreeMap<&String, &String> = headers
        .iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case("authorization"))
        .collect();
    let fingerprint = format!("{}|{:?}", Value::Object(params.clone()), identity);
    let name = format!("report-{:016x}", xxh3_64(fingerprint.as_bytes()));
    params.insert("ReportName".to_string(), Value::String(name));
}

/// Split a `get` body whose id filter exceeds its batch limit
fn split_selection(body: Value) -> Result<Vec<Value>> {
    if body.get("method").and_then(Value::as_str) != Some("get") {
        return Ok(vec![body]);
    }
    let Some((field, ids)) = selection_ids(&body)? else {
        return Ok(vec![body]);
    };

    let size = max_batch_size(&field).unwrap_or(usize::MAX);
    if ids.len() <= size {
        return Ok(vec![body]);
    }

    Ok(ids
        .chunks(size)
        .map(|chunk| {
            let mut part = body.clone();
            part["params"]["SelectionCriteria"][field.as_str()] = Value::Array(chunk.to_vec());
            part
        })
        .collect())
}

/// The single id-list field of SelectionCriteria and its ids
fn selection_ids(body: &Value) -> Result<Option<(String, Vec<Value>)>> {
    let Some(criteria) = body
        .get("params")
        .and_then(|p| p.get("SelectionCriteria"))
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };

    let mut id_fields: Vec<String> = criteria
        .keys()
        .filter(|key| max_batch_size(key).is_some())
        .cloned()
        .collect();
    if id_fields.len() > 1 {
        return Err(Error::AmbiguousFilter { fields: id_fields });
    }
    let Some(field) = id_fields.pop() else {
        return Ok(None);
    };

    match criteria.get(&field) {
        Some(Value::Array(ids)) => Ok(Some((field, ids.clone()))),
        Some(other) => Err(Error::TypeMismatch {
            found: json_type_name(other).to_string(),
            field,
        }),
        None => Ok(None),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
