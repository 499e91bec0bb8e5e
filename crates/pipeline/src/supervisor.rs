//! Fixed-backoff reconnection around the canvas feed.
//!
//! [`ReconnectSupervisor`] is a two-state machine. While `Streaming` it
//! runs one feed session at a time: a fresh [`FeedDecoder`] task paired
//! with a fresh subscription. A retryable session end waits
//! [`ReconnectConfig::delay`] and streams again; a protocol error moves it
//! to `Terminated`, which is final.

use std::sync::Arc;
use std::time::Duration;

use annot_canvas::client::{FeedSource, StreamError};
use tokio::sync::mpsc;

use crate::feed::FeedDecoder;
use crate::jobs::PendingLabelJob;
use crate::store::ImageStore;

/// Delay between a dropped feed and the next subscription attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Capacity of the record channel between line reader and decoder.
const RECORD_QUEUE_CAPACITY: usize = 64;

/// Tunable parameters for the reconnect strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Fixed wait before every reconnection attempt.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

enum SupervisorState {
    Streaming,
    Terminated(StreamError),
}

/// Owns the image store across feed sessions.
pub struct ReconnectSupervisor {
    feed: Arc<dyn FeedSource>,
    config: ReconnectConfig,
    dispatch_tx: mpsc::Sender<PendingLabelJob>,
    store: ImageStore,
}

impl ReconnectSupervisor {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        config: ReconnectConfig,
        dispatch_tx: mpsc::Sender<PendingLabelJob>,
    ) -> Self {
        Self {
            feed,
            config,
            dispatch_tx,
            store: ImageStore::new(),
        }
    }

    /// Stream until a non-retryable error, which is returned.
    ///
    /// There is no retry limit: transport failures are retried forever.
    pub async fn run(mut self) -> StreamError {
        let mut state = SupervisorState::Streaming;
        let mut attempt = 0u64;

        loop {
            state = match state {
                SupervisorState::Streaming => {
                    attempt += 1;
                    let err = self.run_session(attempt).await;
                    if err.is_retryable() {
                        tracing::warn!(
                            attempt,
                            error = %err,
                            delay_ms = self.config.delay.as_millis() as u64,
                            "Canvas feed lost, reconnecting",
                        );
                        tokio::time::sleep(self.config.delay).await;
                        SupervisorState::Streaming
                    } else {
                        SupervisorState::Terminated(err)
                    }
                }
                SupervisorState::Terminated(err) => {
                    tracing::error!(
                        attempt,
                        error = %err,
                        "Canvas feed rejected, not reconnecting",
                    );
                    return err;
                }
            };
        }
    }

    /// Run one subscription with its own decoder task and wait for both to
    /// finish.
    async fn run_session(&mut self, attempt: u64) -> StreamError {
        tracing::info!(attempt, tracked_images = self.store.len(), "Opening canvas feed");

        let (record_tx, record_rx) = mpsc::channel(RECORD_QUEUE_CAPACITY);
        let decoder = FeedDecoder::new(std::mem::take(&mut self.store), self.dispatch_tx.clone());
        let decoder_task = tokio::spawn(decoder.run(record_rx));

        let err = self.feed.stream_records(record_tx).await;

        match decoder_task.await {
            Ok(store) => self.store = store,
            Err(e) => {
                // The canvas-side note check still prevents duplicates.
                tracing::error!(error = %e, "Feed decoder task failed, image store reset");
            }
        }

        err
    }
}
