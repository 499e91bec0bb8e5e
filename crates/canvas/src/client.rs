//! Streaming client for the canvas image feed.
//!
//! [`CanvasFeed`] opens `GET /canvases/{id}/images?subscribe` and turns the
//! newline-delimited response body into raw records on an `mpsc` channel.
//! A session always ends in a [`StreamError`]; the caller decides from
//! [`StreamError::is_retryable`] whether to reconnect.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::endpoint::{CanvasEndpoint, TOKEN_HEADER};

/// One newline-terminated record of the feed, without the newline.
pub type RawRecord = Vec<u8>;

/// Source of raw feed records.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Stream records into `output` until the session ends.
    ///
    /// `output` is consumed, so the receiving side observes the channel
    /// closing as soon as this returns.
    async fn stream_records(&self, output: mpsc::Sender<RawRecord>) -> StreamError;
}

/// Why a feed session ended.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The canvas answered the subscription with a status other than 200.
    /// Reconnecting will not help until the configuration is fixed.
    #[error("Feed rejected with status {status}: {body}")]
    Protocol {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The connection failed, dropped, or the server ended the stream.
    #[error("Feed transport error: {0}")]
    Transport(String),
}

impl StreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Connect timeout for canvas requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keepalive probe interval on canvas connections. A half-open feed socket
/// then fails its next read with a transport error instead of hanging.
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by [`CanvasFeed`] and the REST API.
///
/// No overall request timeout is set: the subscription stays open
/// indefinitely.
pub fn canvas_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .build()
}

/// Subscribe-feed client for a single canvas.
pub struct CanvasFeed {
    client: reqwest::Client,
    endpoint: CanvasEndpoint,
}

impl CanvasFeed {
    pub fn new(endpoint: CanvasEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// The client must not carry an overall request timeout: the
    /// subscription stays open indefinitely.
    pub fn with_client(client: reqwest::Client, endpoint: CanvasEndpoint) -> Self {
        Self { client, endpoint }
    }

    /// Send the subscription request and check the status line.
    async fn open(&self) -> Result<reqwest::Response, StreamError> {
        let url = self.endpoint.subscribe_url();

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, self.endpoint.token())
            .send()
            .await
            .map_err(|e| StreamError::Transport(format!("Failed to connect to {url}: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StreamError::Protocol {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            canvas_id = self.endpoint.canvas_id(),
            "Subscribed to canvas image feed",
        );
        Ok(response)
    }
}

#[async_trait]
impl FeedSource for CanvasFeed {
    async fn stream_records(&self, output: mpsc::Sender<RawRecord>) -> StreamError {
        match self.open().await {
            Ok(response) => forward_lines(response.bytes_stream(), output).await,
            Err(e) => e,
        }
    }
}

/// Split a chunked body into non-empty lines and send them downstream in
/// arrival order.
///
/// Returns when the body fails, ends, or the receiver goes away. A partial
/// line left over at the end is discarded.
pub async fn forward_lines<S, B, E>(body: S, output: mpsc::Sender<RawRecord>) -> StreamError
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut body = std::pin::pin!(body);
    let mut splitter = LineSplitter::default();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return StreamError::Transport(format!("Feed read failed: {e}")),
        };
        for record in splitter.push(chunk.as_ref()) {
            if output.send(record).await.is_err() {
                return StreamError::Transport("Feed consumer closed".to_string());
            }
        }
    }

    if splitter.pending_len() > 0 {
        tracing::debug!(
            discarded_bytes = splitter.pending_len(),
            "Discarding partial feed record",
        );
    }
    StreamError::Transport("Feed stream closed by server".to_string())
}

/// Incremental `\n` splitter that carries partial lines across chunks.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed one chunk; returns every line it completed. Empty lines are
    /// dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawRecord> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            if !self.pending.is_empty() {
                lines.push(std::mem::take(&mut self.pending));
            }
            rest = &rest[pos + 1..];
        }

        self.pending.extend_from_slice(rest);
        lines
    }

    /// Bytes received since the last newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
