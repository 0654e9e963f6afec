//! Aggregated result of a JSON call
//!
//! A [`CallResponse`] keeps every page of every chunk in request order. The raw
//! bodies stay available next to the extracted item list.

use serde_json::Value;

use crate::extract::extract_pages;
use crate::pagination::Page;
use crate::resources::Resource;
use crate::{Error, Result};

/// All pages returned for one logical call
#[derive(Debug, Clone)]
pub struct CallResponse {
    resource: Resource,
    method: Option<String>,
    pages: Vec<Page>,
}

impl CallResponse {
    pub fn new(resource: Resource, method: Option<String>, pages: Vec<Page>) -> Self {
        Self {
            resource,
            method,
            pages,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// API method of the call, e.g. `get`
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    /// Decoded JSON bodies, in page order
    pub fn raw(&self) -> Vec<&Value> {
        self.pages.iter().filter_map(Page::json).collect()
    }

    /// Payload under the method's result key
    ///
    /// `get` pages are concatenated into one array; other methods return the first
    /// page's payload.
    pub fn extract(&self) -> Result<Value> {
        let method = self.method.as_deref().ok_or_else(|| Error::UnsupportedMethod {
            method: "<none>".to_string(),
        })?;
        if self.pages.iter().any(|page| page.json().is_none()) {
            return Err(Error::Decode {
                message: format!("{} response for {} is not JSON", method, self.resource),
            });
        }
        extract_pages(method, self.resource, self.raw())
    }

    /// Extracted payload as a list of items
    pub fn items(&self) -> Result<Vec<Value>> {
        match self.extract()? {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }

    /// Request ids the server assigned, one per page that carried one
    pub fn request_ids(&self) -> Vec<&str> {
        self.pages
            .iter()
            .filter_map(|page| page.exchange.request_id())
            .collect()
    }

    /// Units spent across all pages, when the server reported them
    pub fn units_spent(&self) -> u64 {
        self.pages
            .iter()
            .filter_map(|page| page.exchange.units())
            .map(|units| units.spent)
            .sum()
    }
}
