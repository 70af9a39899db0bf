//! Stream transport.
//!
//! The registry only needs "connect to a URL, then pull SSE messages", so the
//! network sits behind [`EventTransport`]. Production uses [`HttpTransport`].

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::debug;

use crate::error::{Error, Result};

use super::sse::{SseMessage, SseParser};

/// An open stream of SSE messages.
pub trait MessageStream: Send {
    /// Next message; `None` once the server ends the stream.
    fn next_message(&mut self) -> impl Future<Output = Option<Result<SseMessage>>> + Send;

    /// Reconnect delay the server asked for, if any.
    fn retry_hint(&self) -> Option<Duration> {
        None
    }
}

/// Opens message streams.
pub trait EventTransport: Send + Sync + 'static {
    type Stream: MessageStream + 'static;

    /// Connect to a stream endpoint. `url` already carries the credential.
    fn connect(&self, url: &Url) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// SSE over HTTP via reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventTransport for HttpTransport {
    type Stream = HttpMessageStream;

    async fn connect(&self, url: &Url) -> Result<HttpMessageStream> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: None,
            });
        }

        debug!(path = url.path(), "Event stream response received");
        Ok(HttpMessageStream {
            response,
            parser: SseParser::new(),
            pending: VecDeque::new(),
        })
    }
}

/// Body of an SSE response. Dropping it releases the HTTP connection.
#[derive(Debug)]
pub struct HttpMessageStream {
    response: reqwest::Response,
    parser: SseParser,
    pending: VecDeque<SseMessage>,
}

impl MessageStream for HttpMessageStream {
    async fn next_message(&mut self) -> Option<Result<SseMessage>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }
            match self.response.chunk().await {
                Ok(Some(bytes)) => self.pending.extend(self.parser.feed(&bytes)),
                Ok(None) => return None,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }

    fn retry_hint(&self) -> Option<Duration> {
        self.parser.retry_hint().map(Duration::from_millis)
    }
}
