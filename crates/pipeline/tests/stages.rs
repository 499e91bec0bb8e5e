//! Integration tests for the dispatcher, label worker and note publisher,
//! each driven in isolation against in-memory fakes.

mod common;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use annot_canvas::api::CanvasApiError;
use annot_core::palette::MagicColor;
use annot_pipeline::archive::ImageArchive;
use annot_pipeline::dispatcher::{DispatchDecision, Dispatcher};
use annot_pipeline::jobs::{AnnotationOutcome, AnnotationResult, PendingLabelJob};
use annot_pipeline::labeler::LabelWorker;
use annot_pipeline::publisher::NotePublisher;
use annot_vision::MAX_LABELS;
use assert_matches::assert_matches;
use common::{magic, snapshot, FakeCanvas, FakeDetector};
use tokio::sync::mpsc;

fn job(id: &str) -> PendingLabelJob {
    PendingLabelJob {
        image: snapshot(id),
    }
}

// ---------------------------------------------------------------------------
// Test: dispatcher
// ---------------------------------------------------------------------------

/// A tool-authored note on the image suppresses the job.
#[tokio::test]
async fn dispatcher_skips_image_with_magic_note() {
    let canvas = Arc::new(FakeCanvas::default().with_note("img-1", magic(MagicColor::Apricot)));
    let (label_tx, mut label_rx) = mpsc::channel(4);
    let dispatcher = Dispatcher::new(canvas.clone(), label_tx);

    assert_eq!(
        dispatcher.dispatch(job("img-1")).await,
        DispatchDecision::AlreadyAnnotated
    );
    drop(dispatcher);
    assert!(label_rx.recv().await.is_none());
}

/// A user note in some other color does not count as an annotation.
#[tokio::test]
async fn dispatcher_enqueues_when_only_user_notes_exist() {
    let canvas = Arc::new(
        FakeCanvas::default()
            .with_note("img-1", "#ffffff")
            .with_note("img-2", magic(MagicColor::Lime)),
    );
    let (label_tx, mut label_rx) = mpsc::channel(4);
    let dispatcher = Dispatcher::new(canvas, label_tx);

    assert_eq!(dispatcher.dispatch(job("img-1")).await, DispatchDecision::Enqueued);
    assert_eq!(label_rx.recv().await.unwrap().image.id, "img-1");
}

/// If the note list is unavailable the job is dropped, not enqueued.
#[tokio::test]
async fn dispatcher_drops_job_when_notes_unavailable() {
    let canvas = Arc::new(FakeCanvas::default());
    canvas.fail_list_notes.store(true, Ordering::SeqCst);
    let (label_tx, mut label_rx) = mpsc::channel(4);
    let dispatcher = Dispatcher::new(canvas.clone(), label_tx);

    assert_eq!(
        dispatcher.dispatch(job("img-1")).await,
        DispatchDecision::NotesUnavailable
    );
    assert_eq!(canvas.list_calls.load(Ordering::SeqCst), 1);
    drop(dispatcher);
    assert!(label_rx.recv().await.is_none());
}

#[tokio::test]
async fn dispatcher_reports_stopped_worker() {
    let canvas = Arc::new(FakeCanvas::default());
    let (label_tx, label_rx) = mpsc::channel(4);
    drop(label_rx);
    let dispatcher = Dispatcher::new(canvas, label_tx);

    assert_eq!(
        dispatcher.dispatch(job("img-1")).await,
        DispatchDecision::WorkerStopped
    );
}

// ---------------------------------------------------------------------------
// Test: label worker
// ---------------------------------------------------------------------------

fn worker(canvas: FakeCanvas, detector: Arc<FakeDetector>) -> LabelWorker {
    let (result_tx, _result_rx) = mpsc::channel(4);
    LabelWorker::new(Arc::new(canvas), detector, MAX_LABELS, result_tx)
}

#[tokio::test]
async fn worker_labels_downloaded_image() {
    let detector = Arc::new(FakeDetector::labels(&["Cat", "Pet"]));
    let worker = worker(
        FakeCanvas::default().with_image("img-1", b"jpeg-bytes"),
        detector.clone(),
    );

    let result = worker.process(job("img-1")).await;
    assert_eq!(result.image, snapshot("img-1"));
    assert_eq!(
        result.outcome,
        AnnotationOutcome::Labels(vec!["Cat".to_string(), "Pet".to_string()])
    );
    assert_eq!(result.text(), "Cat\nPet");
    assert_eq!(detector.calls(), vec![(10, MAX_LABELS)]);
}

#[tokio::test]
async fn worker_turns_download_failure_into_note_text() {
    let detector = Arc::new(FakeDetector::labels(&["Cat"]));
    let worker = worker(FakeCanvas::default(), detector.clone());

    let result = worker.process(job("missing")).await;
    assert_matches!(
        result.outcome,
        AnnotationOutcome::Failed(ref text) if text.starts_with("Failed to download image") && text.contains("404")
    );
    assert!(detector.calls().is_empty());
}

#[tokio::test]
async fn worker_turns_service_failure_into_note_text() {
    let worker = worker(
        FakeCanvas::default().with_image("img-1", b"jpeg-bytes"),
        Arc::new(FakeDetector::failing()),
    );

    let result = worker.process(job("img-1")).await;
    assert_matches!(
        result.outcome,
        AnnotationOutcome::Failed(ref text) if text.starts_with("Label detection failed") && text.contains("Bad image data.")
    );
}

/// Every job, whatever its fate, produces exactly one result.
#[tokio::test]
async fn worker_emits_one_result_per_job() {
    let canvas = Arc::new(FakeCanvas::default().with_image("ok", b"bytes"));
    let (label_tx, label_rx) = mpsc::channel(8);
    let (result_tx, mut result_rx) = mpsc::channel(8);
    let worker = LabelWorker::new(
        canvas,
        Arc::new(FakeDetector::labels(&["Thing"])),
        MAX_LABELS,
        result_tx,
    );
    let handle = tokio::spawn(worker.run(label_rx));

    for id in ["ok", "missing", "ok", "also-missing"] {
        label_tx.send(job(id)).await.unwrap();
    }
    drop(label_tx);
    handle.await.unwrap();

    let mut results: Vec<AnnotationResult> = Vec::new();
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }
    let ids: Vec<_> = results.iter().map(|r| r.image.id.as_str()).collect();
    assert_eq!(ids, vec!["ok", "missing", "ok", "also-missing"]);
    let failures: Vec<_> = results.iter().map(|r| r.is_failure()).collect();
    assert_eq!(failures, vec![false, true, false, true]);
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("annot-stages-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn worker_archives_each_image_once() {
    let dir = scratch_dir("archive-once");

    let first = worker(
        FakeCanvas::default().with_image("img-1", b"first"),
        Arc::new(FakeDetector::labels(&["Cat"])),
    )
    .with_archive(ImageArchive::new(&dir));
    let result = first.process(job("img-1")).await;
    assert_matches!(result.outcome, AnnotationOutcome::Labels(_));

    let second = worker(
        FakeCanvas::default().with_image("img-1", b"second"),
        Arc::new(FakeDetector::labels(&["Cat"])),
    )
    .with_archive(ImageArchive::new(&dir));
    let result = second.process(job("img-1")).await;
    assert_matches!(result.outcome, AnnotationOutcome::Labels(_));

    let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(std::fs::read(dir.join("img-1.jpg")).unwrap(), b"first");

    std::fs::remove_dir_all(&dir).unwrap();
}

/// Archive failures are logged only; the image is still labelled.
#[tokio::test]
async fn archive_failure_does_not_affect_labels() {
    let missing = std::env::temp_dir().join(format!(
        "annot-stages-missing-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&missing);

    let detector = Arc::new(FakeDetector::labels(&["Cat", "Pet"]));
    let worker_missing_dir = worker(
        FakeCanvas::default().with_image("img-1", b"bytes"),
        detector.clone(),
    )
    .with_archive(ImageArchive::new(&missing));
    let result = worker_missing_dir.process(job("img-1")).await;
    assert_eq!(
        result.outcome,
        AnnotationOutcome::Labels(vec!["Cat".to_string(), "Pet".to_string()])
    );
    assert!(!missing.exists());

    let dir = scratch_dir("archive-unsafe");
    let worker_unsafe_id = worker(
        FakeCanvas::default().with_image("../escape", b"bytes"),
        detector.clone(),
    )
    .with_archive(ImageArchive::new(&dir));
    let result = worker_unsafe_id.process(job("../escape")).await;
    assert_matches!(result.outcome, AnnotationOutcome::Labels(_));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    assert_eq!(detector.calls().len(), 2);

    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Test: note publisher
// ---------------------------------------------------------------------------

fn labelled(id: &str, labels: &[&str]) -> AnnotationResult {
    AnnotationResult {
        image: snapshot(id),
        outcome: AnnotationOutcome::Labels(labels.iter().map(|l| l.to_string()).collect()),
    }
}

#[tokio::test]
async fn publisher_places_note_near_bottom_right() {
    let canvas = Arc::new(FakeCanvas::default());
    let mut publisher = NotePublisher::new(canvas.clone());

    let note = publisher.publish(&labelled("img-1", &["Cat", "Pet"])).await.unwrap();

    assert_eq!(canvas.created(), vec![note.clone()]);
    assert_eq!(note.parent_id, "img-1");
    assert_eq!(note.text, "Cat\nPet");
    assert_eq!(note.depth, 1);
    assert_eq!(note.background_color, MagicColor::Lime.hex());
    assert_eq!(note.size.width, 300.0);
    assert_eq!(note.size.height, 300.0);
    assert!((note.scale - 1.0 / 3.0).abs() < 1e-9);
    assert!((note.location.x - 950.0).abs() < 1e-9);
    assert!((note.location.y - 317.0).abs() < 1e-9);
}

#[tokio::test]
async fn publisher_publishes_failure_text() {
    let canvas = Arc::new(FakeCanvas::default());
    let mut publisher = NotePublisher::new(canvas.clone());
    let failed = AnnotationResult {
        image: snapshot("img-1"),
        outcome: AnnotationOutcome::Failed("Failed to download image: gone".to_string()),
    };

    publisher.publish(&failed).await.unwrap();
    assert_eq!(canvas.created()[0].text, "Failed to download image: gone");
}

/// Colors rotate on every publish attempt, including failed ones.
#[tokio::test]
async fn publisher_rotates_colors_and_does_not_retry() {
    let canvas = Arc::new(FakeCanvas::default());
    let mut publisher = NotePublisher::new(canvas.clone());

    publisher.publish(&labelled("a", &["x"])).await.unwrap();

    canvas.fail_create_note.store(true, Ordering::SeqCst);
    let err = publisher.publish(&labelled("b", &["x"])).await.unwrap_err();
    assert_matches!(err, CanvasApiError::ApiError { status: 500, .. });
    canvas.fail_create_note.store(false, Ordering::SeqCst);

    publisher.publish(&labelled("c", &["x"])).await.unwrap();

    let colors: Vec<_> = canvas
        .created()
        .into_iter()
        .map(|note| (note.parent_id, note.background_color))
        .collect();
    assert_eq!(
        colors,
        vec![
            ("a".to_string(), MagicColor::Lime.hex().to_string()),
            ("c".to_string(), MagicColor::Apricot.hex().to_string()),
        ]
    );
}
