//! In-process view of the images on the canvas.
//!
//! [`ImageStore`] is owned by the feed decoder and mutated only through
//! [`ImageStore::apply`]. It decides, per image, when labelling work is
//! handed off. The hand-off flag is set eagerly and never cleared while
//! the image is tracked, so each image is dispatched at most once per
//! sighting lifetime. Across restarts the dispatcher's canvas-side check
//! takes over.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use annot_core::types::{WidgetState, WidgetUpdate};

use crate::jobs::PendingLabelJob;

/// Last known state of one image widget.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedImage {
    pub update: WidgetUpdate,
    pub annotation_dispatched: bool,
}

/// Images whose most recent state is `normal`, keyed by widget id.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<String, TrackedImage>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one feed update.
    ///
    /// Returns the job to dispatch when this update makes the image
    /// eligible for labelling: it is tracked, has content, and has not been
    /// dispatched yet.
    pub fn apply(&mut self, update: WidgetUpdate) -> Option<PendingLabelJob> {
        let state = match update.validate() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(widget_id = %update.id, error = %e, "Ignoring widget update");
                return None;
            }
        };

        match state {
            WidgetState::Deleted => {
                if self.images.remove(&update.id).is_some() {
                    tracing::info!(image_id = %update.id, "Image deleted, no longer tracked");
                }
                None
            }
            WidgetState::Normal => {
                let tracked = match self.images.entry(update.id.clone()) {
                    Entry::Occupied(entry) => {
                        let tracked = entry.into_mut();
                        tracked.update = update;
                        tracked
                    }
                    Entry::Vacant(entry) => {
                        tracing::debug!(image_id = %update.id, "Tracking new image");
                        entry.insert(TrackedImage {
                            update,
                            annotation_dispatched: false,
                        })
                    }
                };

                if tracked.annotation_dispatched || !tracked.update.has_content() {
                    return None;
                }

                tracked.annotation_dispatched = true;
                tracing::info!(image_id = %tracked.update.id, "Image ready for annotation");
                Some(PendingLabelJob {
                    image: tracked.update.snapshot(),
                })
            }
        }
    }

    pub fn get(&self, image_id: &str) -> Option<&TrackedImage> {
        self.images.get(image_id)
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.images.contains_key(image_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
