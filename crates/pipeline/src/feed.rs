//! Feed record processing loop.
//!
//! Reads raw records produced by the subscribe feed, parses them into
//! [`WidgetUpdate`](annot_core::types::WidgetUpdate) batches, applies each
//! update to the [`ImageStore`] in wire order, and forwards any resulting
//! job to the dispatcher.

use annot_canvas::client::RawRecord;
use annot_canvas::messages::parse_record;
use tokio::sync::mpsc;

use crate::jobs::PendingLabelJob;
use crate::store::ImageStore;

/// Single consumer of one feed session's records.
///
/// Owns the image store for the duration of the session and hands it back
/// from [`run`](Self::run) so the next session continues from the same
/// state.
pub struct FeedDecoder {
    store: ImageStore,
    dispatch_tx: mpsc::Sender<PendingLabelJob>,
}

impl FeedDecoder {
    pub fn new(store: ImageStore, dispatch_tx: mpsc::Sender<PendingLabelJob>) -> Self {
        Self { store, dispatch_tx }
    }

    /// Process records until the input channel closes, then return the
    /// store.
    pub async fn run(mut self, mut input: mpsc::Receiver<RawRecord>) -> ImageStore {
        while let Some(record) = input.recv().await {
            self.handle_record(&record).await;
        }
        tracing::debug!(tracked_images = self.store.len(), "Feed session drained");
        self.store
    }

    /// Parse one record and apply its updates in array order.
    ///
    /// A malformed record is logged and skipped.
    async fn handle_record(&mut self, record: &[u8]) {
        let text = String::from_utf8_lossy(record);
        tracing::debug!(raw_record = %text, "Feed record received");

        let updates = match parse_record(record) {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_record = %text,
                    "Failed to parse feed record",
                );
                return;
            }
        };

        for update in updates {
            if let Some(job) = self.store.apply(update) {
                let image_id = job.image.id.clone();
                if self.dispatch_tx.send(job).await.is_err() {
                    tracing::error!(image_id = %image_id, "Dispatcher stopped, dropping job");
                }
            }
        }
    }
}
