//! Publishes annotation results as canvas notes.
//!
//! Each note gets the next color of the reserved palette. A failed publish
//! is logged and not retried: no note exists afterwards, so a later sighting
//! of the image in a fresh process is free to try again.

use std::sync::Arc;

use annot_canvas::api::{CanvasApiError, CanvasService};
use annot_core::palette::ColorRotation;
use annot_core::types::NewNote;
use tokio::sync::mpsc;

use crate::jobs::AnnotationResult;

pub struct NotePublisher {
    canvas: Arc<dyn CanvasService>,
    colors: ColorRotation,
}

impl NotePublisher {
    pub fn new(canvas: Arc<dyn CanvasService>) -> Self {
        Self {
            canvas,
            colors: ColorRotation::new(),
        }
    }

    /// Publish results in arrival order until the queue closes.
    pub async fn run(mut self, mut results: mpsc::Receiver<AnnotationResult>) {
        tracing::info!("Note publisher started");
        while let Some(result) = results.recv().await {
            if let Err(e) = self.publish(&result).await {
                tracing::error!(
                    image_id = %result.image.id,
                    error = %e,
                    "Failed to publish annotation note",
                );
            }
        }
        tracing::info!("Note publisher stopped");
    }

    /// Build and post the note for one result.
    pub async fn publish(&mut self, result: &AnnotationResult) -> Result<NewNote, CanvasApiError> {
        let note = NewNote::for_image(&result.image, result.text(), self.colors.next_color());
        self.canvas.create_note(&note).await?;

        tracing::info!(
            image_id = %result.image.id,
            color = %note.background_color,
            failed = result.is_failure(),
            "Annotation note published",
        );
        Ok(note)
    }
}
