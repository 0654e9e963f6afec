//! Lazy page sequences
//!
//! A [`PageStream`] walks the request descriptors of one call in order. When a
//! response carries `result.LimitedBy` and the call asked for every object, the
//! follow-up request for the next offset is sent before the next chunk. Nothing is
//! sent until the caller asks for the next page.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::http::builder::RequestDescriptor;
use crate::http::client::{Delivery, DirectClient};
use crate::http::transport::{Body, Exchange};
use crate::observer::CallEvent;
use crate::{Error, Result};

/// One successful response of a call
#[derive(Debug, Clone)]
pub struct Page {
    pub chunk: usize,
    /// Position within its chunk
    pub index: usize,
    /// `params.Page.Offset` the request was sent with
    pub offset: Option<u64>,
    /// Offset of the next page, when the server cut this one short
    pub limited_by: Option<u64>,
    pub exchange: Exchange,
}

impl Page {
    pub fn body(&self) -> &Body {
        &self.exchange.body
    }

    pub fn json(&self) -> Option<&Value> {
        self.exchange.body.as_json()
    }
}

/// `result.LimitedBy` as an offset; zero, null or absent mean no more pages
pub fn limited_by(body: &Value) -> Option<u64> {
    let marker = body.get("result")?.get("LimitedBy")?;
    let offset = match marker {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (offset > 0).then_some(offset)
}

/// Forward-only sequence of pages; cannot be restarted
pub struct PageStream {
    client: DirectClient,
    config: Arc<ClientConfig>,
    cancel: CancellationToken,
    queue: VecDeque<RequestDescriptor>,
    chunks: usize,
    /// Wrap failures in `ChunkFailed` when the call fanned out
    wrap_errors: bool,
    current_chunk: Option<usize>,
    chunk_pages: usize,
    fetched: usize,
    finished: bool,
}

impl PageStream {
    pub(crate) fn new(
        client: DirectClient,
        config: Arc<ClientConfig>,
        cancel: CancellationToken,
        requests: Vec<RequestDescriptor>,
    ) -> Self {
        let chunks = requests.len();
        Self {
            client,
            config,
            cancel,
            queue: requests.into(),
            chunks,
            wrap_errors: chunks > 1,
            current_chunk: None,
            chunk_pages: 0,
            fetched: 0,
            finished: false,
        }
    }

    /// Stream over a single chunk whose errors are left unwrapped
    pub(crate) fn for_chunk(
        client: DirectClient,
        config: Arc<ClientConfig>,
        cancel: CancellationToken,
        request: RequestDescriptor,
    ) -> Self {
        let mut stream = Self::new(client, config, cancel, vec![request]);
        stream.wrap_errors = false;
        stream
    }

    /// Number of chunks the call fanned out into
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Pages returned so far
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Fetch the next page, or `None` once every chunk is exhausted
    ///
    /// After an error the stream is finished and keeps returning `None`.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }
        let Some(request) = self.queue.pop_front() else {
            self.finished = true;
            return Ok(None);
        };

        if self.current_chunk != Some(request.chunk) {
            self.current_chunk = Some(request.chunk);
            self.chunk_pages = 0;
        }

        let exchange = match self
            .client
            .send(&request, &self.config.retry, &self.cancel)
            .await
        {
            Ok(Delivery::Done(exchange)) => exchange,
            Ok(Delivery::Pending { .. }) => {
                return Err(self.fail(
                    &request,
                    Error::Report {
                        message: "report is not ready yet; request it as a report to poll without waiting"
                            .to_string(),
                    },
                ))
            }
            Err(error) => return Err(self.fail(&request, error)),
        };

        let limited_by = if request.resource.is_report() {
            None
        } else {
            exchange.body.as_json().and_then(limited_by)
        };
        if let Some(offset) = limited_by {
            if self.config.receive_all_objects {
                let current = request.page_offset().unwrap_or(0);
                if offset <= current {
                    return Err(self.fail(
                        &request,
                        Error::Decode {
                            message: format!(
                                "LimitedBy {} does not advance past page offset {}",
                                offset, current
                            ),
                        },
                    ));
                }
                let next = request.with_page_offset(offset);
                if next.page_offset() != Some(offset) {
                    return Err(self.fail(
                        &request,
                        Error::Decode {
                            message: format!(
                                "cannot request the page at offset {}: params is not an object",
                                offset
                            ),
                        },
                    ));
                }
                self.queue.push_front(next);
            }
        }

        let page = Page {
            chunk: request.chunk,
            index: self.chunk_pages,
            offset: request.page_offset(),
            limited_by,
            exchange,
        };
        self.chunk_pages += 1;
        self.fetched += 1;

        self.client.observe(&CallEvent::PageFetched {
            chunk: page.chunk,
            index: page.index,
            offset: page.offset,
            limited_by: page.limited_by,
        });
        Ok(Some(page))
    }

    /// Fetch every remaining page
    pub async fn collect_all(mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }

    /// The same sequence as a `futures` stream
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> {
        stream::try_unfold(self, |mut pages| async move {
            let next = pages.next_page().await?;
            Ok::<_, Error>(next.map(|page| (page, pages)))
        })
    }

    fn fail(&mut self, request: &RequestDescriptor, error: Error) -> Error {
        self.finished = true;
        self.queue.clear();
        if self.wrap_errors {
            Error::ChunkFailed {
                chunk: request.chunk,
                chunks: self.chunks,
                completed_pages: self.fetched,
                source: Box::new(error),
            }
        } else {
            error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limited_by() {
        assert_eq!(limited_by(&json!({"result": {"LimitedBy": 100}})), Some(100));
        assert_eq!(limited_by(&json!({"result": {"LimitedBy": "200"}})), Some(200));
        assert_eq!(limited_by(&json!({"result": {"LimitedBy": 0}})), None);
        assert_eq!(limited_by(&json!({"result": {"LimitedBy": null}})), None);
        assert_eq!(limited_by(&json!({"result": {"Clients": []}})), None);
        assert_eq!(limited_by(&json!({"error": {}})), None);
    }
}
