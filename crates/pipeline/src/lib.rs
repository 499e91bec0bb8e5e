//! Canvas image annotation pipeline.
//!
//! [`AnnotationPipeline`] wires the stages together:
//!
//! ```text
//! feed ─▶ FeedDecoder/ImageStore ─▶ Dispatcher ─▶ LabelWorker ─▶ NotePublisher
//! ```
//!
//! The decoder runs inside the [`ReconnectSupervisor`]; the other three
//! stages are long-lived tasks connected by bounded `mpsc` queues. Stages
//! share no mutable state.

pub mod archive;
pub mod dispatcher;
pub mod feed;
pub mod jobs;
pub mod labeler;
pub mod publisher;
pub mod store;
pub mod supervisor;

use std::path::PathBuf;
use std::sync::Arc;

use annot_canvas::api::CanvasService;
use annot_canvas::client::{FeedSource, StreamError};
use annot_vision::{LabelDetector, MAX_LABELS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::archive::ImageArchive;
use crate::dispatcher::Dispatcher;
use crate::jobs::PendingLabelJob;
use crate::labeler::LabelWorker;
use crate::publisher::NotePublisher;
use crate::supervisor::{ReconnectConfig, ReconnectSupervisor};

/// Capacity of each inter-stage queue. A full queue applies backpressure
/// to the stage feeding it.
const STAGE_QUEUE_CAPACITY: usize = 256;

/// Settings for the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reconnect: ReconnectConfig,
    /// Labels requested per image.
    pub max_labels: usize,
    /// Keep a copy of every downloaded image here when set.
    pub archive_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            max_labels: MAX_LABELS,
            archive_dir: None,
        }
    }
}

/// Running dispatcher, label worker and note publisher.
///
/// Created with [`AnnotationPipeline::start`]; feed the stages by calling
/// [`run`](Self::run) with a feed source.
pub struct AnnotationPipeline {
    config: PipelineConfig,
    dispatch_tx: mpsc::Sender<PendingLabelJob>,
    stages: Vec<JoinHandle<()>>,
}

impl AnnotationPipeline {
    /// Spawn the downstream stages.
    pub fn start(
        canvas: Arc<dyn CanvasService>,
        detector: Arc<dyn LabelDetector>,
        config: PipelineConfig,
    ) -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(STAGE_QUEUE_CAPACITY);
        let (label_tx, label_rx) = mpsc::channel(STAGE_QUEUE_CAPACITY);
        let (result_tx, result_rx) = mpsc::channel(STAGE_QUEUE_CAPACITY);

        let dispatcher = Dispatcher::new(Arc::clone(&canvas), label_tx);

        let mut worker =
            LabelWorker::new(Arc::clone(&canvas), detector, config.max_labels, result_tx);
        if let Some(dir) = &config.archive_dir {
            tracing::info!(dir = %dir.display(), "Archiving downloaded images");
            worker = worker.with_archive(ImageArchive::new(dir));
        }

        let publisher = NotePublisher::new(canvas);

        let stages = vec![
            tokio::spawn(dispatcher.run(dispatch_rx)),
            tokio::spawn(worker.run(label_rx)),
            tokio::spawn(publisher.run(result_rx)),
        ];

        Self {
            config,
            dispatch_tx,
            stages,
        }
    }

    /// Sender into the dispatcher queue. Clones must be dropped before
    /// [`shutdown`](Self::shutdown) can complete.
    pub fn dispatch_sender(&self) -> mpsc::Sender<PendingLabelJob> {
        self.dispatch_tx.clone()
    }

    /// Mirror `feed` until it fails permanently, then drain in-flight work
    /// and return the terminating error.
    pub async fn run(self, feed: Arc<dyn FeedSource>) -> StreamError {
        let supervisor = ReconnectSupervisor::new(
            feed,
            self.config.reconnect.clone(),
            self.dispatch_tx.clone(),
        );
        let err = supervisor.run().await;
        self.shutdown().await;
        err
    }

    /// Close the dispatcher queue and wait for every stage to finish the
    /// work it already holds.
    pub async fn shutdown(self) {
        drop(self.dispatch_tx);
        for stage in self.stages {
            if let Err(e) = stage.await {
                tracing::error!(error = %e, "Pipeline stage task failed");
            }
        }
    }
}
