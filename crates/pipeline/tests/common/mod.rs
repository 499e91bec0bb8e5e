//! In-memory stand-ins for the canvas, the label service and the feed.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use annot_canvas::api::{CanvasApiError, CanvasService};
use annot_canvas::client::{FeedSource, RawRecord, StreamError};
use annot_core::palette::MagicColor;
use annot_core::types::{ExistingNote, ImageSnapshot, NewNote, WidgetSize};
use annot_vision::{LabelDetector, LabelError};
use async_trait::async_trait;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Canvas that keeps notes in memory. Created notes show up in later
/// listings, like on the real canvas.
#[derive(Default)]
pub struct FakeCanvas {
    notes: Mutex<Vec<ExistingNote>>,
    created: Mutex<Vec<NewNote>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_list_notes: AtomicBool,
    pub fail_create_note: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl FakeCanvas {
    pub fn with_image(self, image_id: &str, bytes: &[u8]) -> Self {
        self.images
            .lock()
            .unwrap()
            .insert(image_id.to_string(), bytes.to_vec());
        self
    }

    pub fn with_note(self, parent_id: &str, background_color: &str) -> Self {
        self.notes.lock().unwrap().push(ExistingNote {
            id: format!("note-{parent_id}"),
            parent_id: Some(parent_id.to_string()),
            state: "normal".to_string(),
            text: "existing".to_string(),
            background_color: background_color.to_string(),
        });
        self
    }

    pub fn created(&self) -> Vec<NewNote> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl CanvasService for FakeCanvas {
    async fn list_notes(&self) -> Result<Vec<ExistingNote>, CanvasApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_notes.load(Ordering::SeqCst) {
            return Err(CanvasApiError::ApiError {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn create_note(&self, note: &NewNote) -> Result<(), CanvasApiError> {
        if self.fail_create_note.load(Ordering::SeqCst) {
            return Err(CanvasApiError::ApiError {
                status: 500,
                body: "boom".to_string(),
            });
        }
        let mut notes = self.notes.lock().unwrap();
        let id = format!("created-{}", notes.len());
        notes.push(ExistingNote {
            id,
            parent_id: Some(note.parent_id.clone()),
            state: "normal".to_string(),
            text: note.text.clone(),
            background_color: note.background_color.clone(),
        });
        self.created.lock().unwrap().push(note.clone());
        Ok(())
    }

    async fn download_image(&self, image_id: &str) -> Result<Vec<u8>, CanvasApiError> {
        self.images
            .lock()
            .unwrap()
            .get(image_id)
            .cloned()
            .ok_or_else(|| CanvasApiError::ApiError {
                status: 404,
                body: "no such image".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Label service
// ---------------------------------------------------------------------------

/// Detector that answers every image with the same labels, or fails.
pub struct FakeDetector {
    labels: Vec<String>,
    fail: bool,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl FakeDetector {
    pub fn labels(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            labels: Vec::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(image byte length, max_results)` per call.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelDetector for FakeDetector {
    async fn detect_labels(
        &self,
        image: &[u8],
        max_results: usize,
    ) -> Result<Vec<String>, LabelError> {
        self.calls.lock().unwrap().push((image.len(), max_results));
        if self.fail {
            return Err(LabelError::Service {
                code: 3,
                message: "Bad image data.".to_string(),
            });
        }
        Ok(self.labels.iter().take(max_results).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Feed that plays back one scripted session per subscription and then
/// rejects further subscriptions.
pub struct ScriptedFeed {
    sessions: Mutex<VecDeque<(Vec<String>, StreamError)>>,
    pub opened: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(sessions: Vec<(Vec<String>, StreamError)>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            opened: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn stream_records(&self, output: mpsc::Sender<RawRecord>) -> StreamError {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let next = self.sessions.lock().unwrap().pop_front();
        let Some((records, err)) = next else {
            return protocol_error();
        };
        for record in records {
            if output.send(record.into_bytes()).await.is_err() {
                break;
            }
        }
        err
    }
}

pub fn protocol_error() -> StreamError {
    StreamError::Protocol {
        status: 401,
        body: "invalid token".to_string(),
    }
}

pub fn transport_error() -> StreamError {
    StreamError::Transport("connection reset".to_string())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// One feed record holding a single image update.
pub fn image_record(id: &str, state: &str, hash: &str) -> String {
    serde_json::json!([{
        "id": id,
        "widget_type": "Image",
        "state": state,
        "content_hash": hash,
        "size": { "height": 450, "width": 1000 },
    }])
    .to_string()
}

pub fn snapshot(id: &str) -> ImageSnapshot {
    ImageSnapshot {
        id: id.to_string(),
        size: WidgetSize {
            height: 450.0,
            width: 1000.0,
        },
    }
}

pub fn magic(color: MagicColor) -> &'static str {
    color.hex()
}
