//! Canvas-side idempotency check before labelling.
//!
//! The image store forgets everything on restart, so before queuing work
//! the dispatcher asks the canvas whether a note in one of the reserved
//! [`MagicColor`](annot_core::palette::MagicColor)s is already attached to
//! the image. If the note list cannot be fetched the job is dropped rather
//! than risk a duplicate annotation.

use std::sync::Arc;

use annot_canvas::api::CanvasService;
use tokio::sync::mpsc;

use crate::jobs::PendingLabelJob;

/// What happened to a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Queued for the label worker.
    Enqueued,
    /// A tool-authored note already exists for the image.
    AlreadyAnnotated,
    /// The note list could not be fetched; job dropped.
    NotesUnavailable,
    /// The label worker is gone; job dropped.
    WorkerStopped,
}

pub struct Dispatcher {
    canvas: Arc<dyn CanvasService>,
    label_tx: mpsc::Sender<PendingLabelJob>,
}

impl Dispatcher {
    pub fn new(canvas: Arc<dyn CanvasService>, label_tx: mpsc::Sender<PendingLabelJob>) -> Self {
        Self { canvas, label_tx }
    }

    /// Handle jobs one at a time until every sender is dropped.
    pub async fn run(self, mut jobs: mpsc::Receiver<PendingLabelJob>) {
        tracing::info!("Annotation dispatcher started");
        while let Some(job) = jobs.recv().await {
            self.dispatch(job).await;
        }
        tracing::info!("Annotation dispatcher stopped");
    }

    pub async fn dispatch(&self, job: PendingLabelJob) -> DispatchDecision {
        let image_id = job.image.id.clone();

        let notes = match self.canvas.list_notes().await {
            Ok(notes) => notes,
            Err(e) => {
                tracing::error!(
                    image_id = %image_id,
                    error = %e,
                    "Failed to list canvas notes, skipping annotation",
                );
                return DispatchDecision::NotesUnavailable;
            }
        };

        if notes.iter().any(|note| note.annotates(&image_id)) {
            tracing::info!(image_id = %image_id, "Image already annotated on canvas");
            return DispatchDecision::AlreadyAnnotated;
        }

        if self.label_tx.send(job).await.is_err() {
            tracing::error!(image_id = %image_id, "Label worker stopped, dropping job");
            return DispatchDecision::WorkerStopped;
        }

        tracing::debug!(image_id = %image_id, "Queued image for labelling");
        DispatchDecision::Enqueued
    }
}
