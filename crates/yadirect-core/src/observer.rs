//! Call lifecycle events and observers
//!
//! The engine reports every send, retry, report poll, page and failure as a
//! [`CallEvent`]. Observers are injected into the client; [`TracingObserver`] is the
//! default and [`NoopObserver`] keeps tests quiet.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::http::builder::RequestDescriptor;
use crate::http::transport::Units;
use crate::{Error, ErrorKind};

/// Events emitted while a call executes
#[derive(Debug)]
pub enum CallEvent<'a> {
    /// A request is about to go out; `attempt` starts at 1
    RequestSent {
        request: &'a RequestDescriptor,
        attempt: u32,
    },
    ResponseReceived {
        request: &'a RequestDescriptor,
        status: u16,
        request_id: Option<&'a str>,
        units: Option<Units>,
    },
    /// The same request will be sent again after `wait`
    RetryScheduled {
        request: &'a RequestDescriptor,
        kind: ErrorKind,
        wait: Duration,
        attempt: u32,
    },
    /// A report is not ready yet
    ReportPending {
        request: &'a RequestDescriptor,
        retry_in: Duration,
        poll: u32,
    },
    /// A page was fetched; `limited_by` is set when more pages follow
    PageFetched {
        chunk: usize,
        index: usize,
        offset: Option<u64>,
        limited_by: Option<u64>,
    },
    RequestFailed {
        request: &'a RequestDescriptor,
        error: &'a Error,
    },
}

/// Receives [`CallEvent`]s
pub trait CallObserver: Send + Sync {
    fn on_event(&self, _event: &CallEvent<'_>) {}
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {}

/// Observer backed by a closure
pub struct FnObserver<F>(F)
where
    F: Fn(&CallEvent<'_>) + Send + Sync;

impl<F> FnObserver<F>
where
    F: Fn(&CallEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CallObserver for FnObserver<F>
where
    F: Fn(&CallEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &CallEvent<'_>) {
        (self.0)(event)
    }
}

/// Logs events via `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CallObserver for TracingObserver {
    fn on_event(&self, event: &CallEvent<'_>) {
        match event {
            CallEvent::RequestSent { request, attempt } => {
                debug!(
                    url = %request.url,
                    method = request.api_method().unwrap_or("-"),
                    chunk = request.chunk,
                    attempt,
                    "sending request"
                );
            }
            CallEvent::ResponseReceived {
                request,
                status,
                request_id,
                units,
            } => {
                debug!(
                    url = %request.url,
                    status,
                    request_id = request_id.unwrap_or("-"),
                    units_left = units.map(|u| u.remaining),
                    "response received"
                );
            }
            CallEvent::RetryScheduled {
                request,
                kind,
                wait,
                attempt,
            } => {
                warn!(
                    url = %request.url,
                    chunk = request.chunk,
                    %kind,
                    attempt,
                    "retrying in {:?}",
                    wait
                );
            }
            CallEvent::ReportPending {
                request,
                retry_in,
                poll,
            } => {
                info!(url = %request.url, poll, "report not ready, polling again in {:?}", retry_in);
            }
            CallEvent::PageFetched {
                chunk,
                index,
                offset,
                limited_by,
            } => {
                debug!(chunk, index, ?offset, ?limited_by, "page fetched");
            }
            CallEvent::RequestFailed { request, error } => {
                warn!(
                    url = %request.url,
                    chunk = request.chunk,
                    kind = %error.kind(),
                    "request failed: {}",
                    error
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fn_observer_receives_events() {
        let count = AtomicUsize::new(0);
        let observer = FnObserver::new(|event: &CallEvent<'_>| {
            if let CallEvent::PageFetched { index, .. } = event {
                count.fetch_add(*index + 1, Ordering::SeqCst);
            }
        });
        observer.on_event(&CallEvent::PageFetched {
            chunk: 0,
            index: 1,
            offset: Some(100),
            limited_by: None,
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_noop_and_tracing_accept_events() {
        let event = CallEvent::PageFetched {
            chunk: 0,
            index: 0,
            offset: None,
            limited_by: Some(10),
        };
        NoopObserver.on_event(&event);
        TracingObserver.on_event(&event);
    }
}
