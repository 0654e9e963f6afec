//! Yandex Direct client orchestrating all components
//!
//! [`DirectClient`] builds requests for a [`LogicalCall`], sends each through the
//! [`Transport`], classifies the response and waits, resends or polls as the
//! classifier directs. Results come back as pages, an extracted [`CallResponse`] or a
//! [`ReportResponse`].

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::call::LogicalCall;
use crate::config::ClientConfig;
use crate::http::builder::{RequestBuilder, RequestDescriptor};
use crate::http::classifier::{classify, ResponseOutcome};
use crate::http::error::ApiError;
use crate::http::retry::{wait_or_cancel, RetryDecision, RetryHandler, RetryPolicy};
use crate::http::transport::{
    Exchange, JsonCodec, ReqwestTransport, ResponseCodec, Transport, TransportError,
};
use crate::observer::{CallEvent, CallObserver, TracingObserver};
use crate::pagination::{Page, PageStream};
use crate::report::Report;
use crate::response::CallResponse;
use crate::resources::Resource;
use crate::{Error, ErrorKind, Result};

/// Final state of one request descriptor
#[derive(Debug, Clone)]
pub enum Delivery {
    Done(Exchange),
    /// Report still building and the call asked not to wait
    Pending { exchange: Exchange, retry_in: Duration },
}

/// Result of a report call
#[derive(Debug, Clone)]
pub enum ReportResponse {
    Ready(Report),
    /// Returned instead of waiting when `wait_report` is off
    Pending { status: u16, retry_in: Duration },
}

impl ReportResponse {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReportResponse::Ready(_))
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            ReportResponse::Ready(report) => Some(report),
            ReportResponse::Pending { .. } => None,
        }
    }
}

/// Client for the Yandex Direct API v5
#[derive(Clone)]
pub struct DirectClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn ResponseCodec>,
    observer: Arc<dyn CallObserver>,
}

impl std::fmt::Debug for DirectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DirectClient`] with custom transport, codec or observer
pub struct DirectClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    codec: Arc<dyn ResponseCodec>,
    observer: Arc<dyn CallObserver>,
}

impl DirectClientBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn codec(mut self, codec: impl ResponseCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn observer(mut self, observer: impl CallObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn build(self) -> Result<DirectClient> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.timeout())?),
        };
        Ok(DirectClient {
            config: Arc::new(self.config),
            transport,
            codec: self.codec,
            observer: self.observer,
        })
    }
}

impl DirectClient {
    /// Create a client with the reqwest transport and tracing observer
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> DirectClientBuilder {
        DirectClientBuilder {
            config,
            transport: None,
            codec: Arc::new(JsonCodec),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Request descriptors `call` expands to, without sending anything
    pub fn build_requests(&self, call: &LogicalCall) -> Result<Vec<RequestDescriptor>> {
        let effective = self.config.apply(call.options())?;
        RequestBuilder::new(&effective).build(call)
    }

    pub(crate) fn observe(&self, event: &CallEvent<'_>) {
        self.observer.on_event(event);
    }

    /// Send one descriptor until it succeeds, fails fatally or is cancelled
    ///
    /// Transient failures are retried within the policy's budget; rate limits, unit
    /// shortages and pending reports are waited out without spending it.
    pub async fn send(
        &self,
        request: &RequestDescriptor,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Delivery> {
        let mut retry = RetryHandler::new(policy.clone());

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let attempt = retry.record_attempt();
            self.observe(&CallEvent::RequestSent { request, attempt });

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                sent = self.transport.send(request) => sent,
            };

            let raw = match sent {
                Ok(raw) => raw,
                Err(failure) => match retry.on_network_failure(&failure) {
                    RetryDecision::Retry { delay } => {
                        self.observe(&CallEvent::RetryScheduled {
                            request,
                            kind: network_kind(&failure),
                            wait: delay,
                            attempt,
                        });
                        wait_or_cancel(delay, cancel).await?;
                        continue;
                    }
                    RetryDecision::NoRetry => {
                        let error = Error::Api(ApiError::from_transport(&failure).with_request(request));
                        self.observe(&CallEvent::RequestFailed { request, error: &error });
                        return Err(error);
                    }
                },
            };

            let exchange = Exchange::decode(raw, self.codec.as_ref());
            self.observe(&CallEvent::ResponseReceived {
                request,
                status: exchange.status,
                request_id: exchange.request_id(),
                units: exchange.units(),
            });

            match classify(exchange, retry.policy(), retry.server_errors()) {
                ResponseOutcome::Success(exchange) => return Ok(Delivery::Done(exchange)),
                ResponseOutcome::ReportPending { exchange, retry_in } => {
                    if !retry.policy().wait_report {
                        return Ok(Delivery::Pending { exchange, retry_in });
                    }
                    let poll = retry.record_report_poll();
                    self.observe(&CallEvent::ReportPending {
                        request,
                        retry_in,
                        poll,
                    });
                    wait_or_cancel(retry_in, cancel).await?;
                }
                ResponseOutcome::Retryable { kind, wait } => {
                    retry.record_retry(kind);
                    self.observe(&CallEvent::RetryScheduled {
                        request,
                        kind,
                        wait,
                        attempt,
                    });
                    wait_or_cancel(wait, cancel).await?;
                }
                ResponseOutcome::Fatal(api) => {
                    let error = Error::Api(api.with_request(request));
                    self.observe(&CallEvent::RequestFailed { request, error: &error });
                    return Err(error);
                }
            }
        }
    }

    /// Lazy page sequence over every chunk of `call`
    ///
    /// Chunks are walked one after another; a failing chunk ends the sequence.
    pub fn pages(&self, call: &LogicalCall) -> Result<PageStream> {
        let effective = Arc::new(self.config.apply(call.options())?);
        let requests = RequestBuilder::new(&effective).build(call)?;
        Ok(PageStream::new(
            self.clone(),
            effective,
            call.cancellation().clone(),
            requests,
        ))
    }

    /// Execute `call` to completion and gather every page
    ///
    /// Chunks run with at most `max_concurrent_chunks` in flight and are gathered in
    /// chunk order. A failing chunk does not stop its siblings; the first failure in
    /// chunk order is returned as `ChunkFailed` once all have finished.
    pub async fn call(&self, call: &LogicalCall) -> Result<CallResponse> {
        let effective = Arc::new(self.config.apply(call.options())?);
        let requests = RequestBuilder::new(&effective).build(call)?;
        let chunks = requests.len();
        let cancel = call.cancellation().clone();

        debug!(
            resource = %call.resource(),
            method = call.api_method().unwrap_or("-"),
            chunks,
            "executing call"
        );

        let results: Vec<Result<Vec<Page>>> = stream::iter(requests)
            .map(|request| {
                PageStream::for_chunk(self.clone(), effective.clone(), cancel.clone(), request)
                    .collect_all()
            })
            .buffered(effective.max_concurrent_chunks.max(1))
            .collect()
            .await;

        let mut pages = Vec::new();
        for (chunk, result) in results.into_iter().enumerate() {
            match result {
                Ok(chunk_pages) => pages.extend(chunk_pages),
                Err(error) if chunks > 1 => {
                    warn!(chunk, chunks, "call incomplete: {}", error);
                    return Err(Error::ChunkFailed {
                        chunk,
                        chunks,
                        completed_pages: pages.len(),
                        source: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(CallResponse::new(
            call.resource(),
            call.api_method().map(str::to_string),
            pages,
        ))
    }

    /// Request a report, polling until it is ready unless `wait_report` is off
    pub async fn report(&self, call: &LogicalCall) -> Result<ReportResponse> {
        if !call.resource().is_report() {
            return Err(Error::UnsupportedResource {
                resource: call.resource().to_string(),
            });
        }
        let effective = self.config.apply(call.options())?;
        let requests = RequestBuilder::new(&effective).build(call)?;
        let Some(request) = requests.first() else {
            return Err(Error::Decode {
                message: "no request built for report".to_string(),
            });
        };

        match self
            .send(request, &effective.retry, call.cancellation())
            .await?
        {
            Delivery::Done(exchange) => {
                let text = exchange.body.to_text();
                Ok(ReportResponse::Ready(Report::new(text, &effective.report)))
            }
            Delivery::Pending { exchange, retry_in } => Ok(ReportResponse::Pending {
                status: exchange.status,
                retry_in,
            }),
        }
    }

    /// `get` every object of `resource` matching `params` and extract the item list
    pub async fn get(&self, resource: Resource, params: serde_json::Value) -> Result<serde_json::Value> {
        self.call(&LogicalCall::get(resource, params)).await?.extract()
    }
}

fn network_kind(failure: &TransportError) -> ErrorKind {
    match failure {
        TransportError::Timeout(_) => ErrorKind::Timeout,
        _ => ErrorKind::ConnectionFailure,
    }
}
