//! Shared test support utilities for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use yadirect_core::http::{RawResponse, RequestDescriptor, Transport, TransportError};
use yadirect_core::{ClientConfig, DirectClient, NoopObserver};

/// One scripted reply
pub enum Step {
    Reply(RawResponse),
    Fail(TransportError),
    /// Never answers; only cancellation gets the caller out
    Hang,
}

/// Transport that replays a fixed script and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replies(replies: Vec<RawResponse>) -> Arc<Self> {
        Self::new(replies.into_iter().map(Step::Reply).collect())
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(raw)) => Ok(raw),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Request("script exhausted".to_string())),
        }
    }
}

/// Transport that answers each request with a closure of the request
pub struct HandlerTransport<F>
where
    F: Fn(&RequestDescriptor) -> RawResponse + Send + Sync,
{
    handler: F,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl<F> HandlerTransport<F>
where
    F: Fn(&RequestDescriptor) -> RawResponse + Send + Sync,
{
    pub fn new(handler: F) -> Arc<Self> {
        Arc::new(Self {
            handler,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> Transport for HandlerTransport<F>
where
    F: Fn(&RequestDescriptor) -> RawResponse + Send + Sync,
{
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        Ok((self.handler)(request))
    }
}

/// Client over `transport` with the given config and no logging
pub fn client_with(config: ClientConfig, transport: Arc<dyn Transport>) -> DirectClient {
    DirectClient::builder(config)
        .shared_transport(transport)
        .observer(NoopObserver)
        .build()
        .expect("client builds")
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("test-token")
}

pub fn json_reply(body: Value) -> RawResponse {
    RawResponse::new(200, body.to_string()).with_header("Content-Type", "application/json")
}

pub fn error_reply(status: u16, code: i64) -> RawResponse {
    let body = json!({
        "error": {
            "error_code": code,
            "request_id": "8071390000000000001",
            "error_string": "Error",
            "error_detail": format!("code {}", code)
        }
    });
    RawResponse::new(status, body.to_string()).with_header("Content-Type", "application/json")
}

pub fn pending_reply(status: u16, retry_in: Option<u64>) -> RawResponse {
    let raw = RawResponse::new(status, "");
    match retry_in {
        Some(secs) => raw.with_header("retryIn", secs.to_string()),
        None => raw,
    }
}

pub fn tsv_reply(body: &str) -> RawResponse {
    RawResponse::new(200, body).with_header("Content-Type", "text/tab-separated-values")
}

/// Value of `params.SelectionCriteria.<field>` in a recorded request
pub fn selection(request: &RequestDescriptor, field: &str) -> Value {
    request.body["params"]["SelectionCriteria"][field].clone()
}
