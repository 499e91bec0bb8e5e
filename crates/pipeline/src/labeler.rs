//! Label worker: download, detect, report.
//!
//! Every job yields exactly one [`AnnotationResult`]. Download and
//! label-service failures become the note text so the canvas shows what
//! went wrong.

use std::sync::Arc;

use annot_canvas::api::CanvasService;
use annot_vision::LabelDetector;
use tokio::sync::mpsc;

use crate::archive::{ArchiveOutcome, ImageArchive};
use crate::jobs::{AnnotationOutcome, AnnotationResult, PendingLabelJob};

pub struct LabelWorker {
    canvas: Arc<dyn CanvasService>,
    detector: Arc<dyn LabelDetector>,
    max_labels: usize,
    archive: Option<ImageArchive>,
    result_tx: mpsc::Sender<AnnotationResult>,
}

impl LabelWorker {
    pub fn new(
        canvas: Arc<dyn CanvasService>,
        detector: Arc<dyn LabelDetector>,
        max_labels: usize,
        result_tx: mpsc::Sender<AnnotationResult>,
    ) -> Self {
        Self {
            canvas,
            detector,
            max_labels,
            archive: None,
            result_tx,
        }
    }

    /// Also keep a copy of every downloaded image in `archive`.
    pub fn with_archive(mut self, archive: ImageArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Process jobs one at a time until the queue closes.
    pub async fn run(self, mut jobs: mpsc::Receiver<PendingLabelJob>) {
        tracing::info!(max_labels = self.max_labels, "Label worker started");
        while let Some(job) = jobs.recv().await {
            let result = self.process(job).await;
            let image_id = result.image.id.clone();
            if self.result_tx.send(result).await.is_err() {
                tracing::error!(image_id = %image_id, "Note publisher stopped, dropping result");
            }
        }
        tracing::info!("Label worker stopped");
    }

    /// Label one image.
    pub async fn process(&self, job: PendingLabelJob) -> AnnotationResult {
        let image = job.image;
        let outcome = self.label(&image.id).await;

        if let AnnotationOutcome::Failed(ref message) = outcome {
            tracing::warn!(image_id = %image.id, error = %message, "Labelling failed");
        } else {
            tracing::info!(image_id = %image.id, "Image labelled");
        }

        AnnotationResult { image, outcome }
    }

    async fn label(&self, image_id: &str) -> AnnotationOutcome {
        let bytes = match self.canvas.download_image(image_id).await {
            Ok(bytes) => bytes,
            Err(e) => return AnnotationOutcome::Failed(format!("Failed to download image: {e}")),
        };

        if let Some(archive) = &self.archive {
            match archive.store(image_id, &bytes).await {
                Ok(ArchiveOutcome::Written(path)) => {
                    tracing::debug!(image_id, path = %path.display(), "Archived image");
                }
                Ok(ArchiveOutcome::AlreadyPresent(path)) => {
                    tracing::debug!(image_id, path = %path.display(), "Archive copy already exists");
                }
                Err(e) => {
                    tracing::warn!(image_id, error = %e, "Failed to archive image");
                }
            }
        }

        match self.detector.detect_labels(&bytes, self.max_labels).await {
            Ok(labels) => AnnotationOutcome::Labels(labels),
            Err(e) => AnnotationOutcome::Failed(format!("Label detection failed: {e}")),
        }
    }
}
