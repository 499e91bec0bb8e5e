//! Messages passed between pipeline stages.

use annot_core::types::ImageSnapshot;

/// Note text used when the service finds nothing to say about an image.
pub const NO_LABELS_TEXT: &str = "No labels detected";

/// An image handed off for labelling, as it looked at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLabelJob {
    pub image: ImageSnapshot,
}

/// What the label worker produced for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationOutcome {
    /// Ranked label descriptions.
    Labels(Vec<String>),
    /// Human-readable reason the image could not be labelled.
    Failed(String),
}

/// Output of the label worker, input of the note publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationResult {
    pub image: ImageSnapshot,
    pub outcome: AnnotationOutcome,
}

impl AnnotationResult {
    /// Text of the note to publish. Failures are shown on the canvas too.
    pub fn text(&self) -> String {
        match &self.outcome {
            AnnotationOutcome::Labels(labels) if labels.is_empty() => NO_LABELS_TEXT.to_string(),
            AnnotationOutcome::Labels(labels) => labels.join("\n"),
            AnnotationOutcome::Failed(message) => message.clone(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AnnotationOutcome::Failed(_))
    }
}
