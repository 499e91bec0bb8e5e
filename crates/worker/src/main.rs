//! `annot-worker` -- labels the images on a canvas.
//!
//! Mirrors the canvas widget feed, sends every newly seen image to the
//! label service and pins the resulting labels next to the image as a
//! note. See [`annot_worker::config::WorkerConfig`] for the environment
//! variables it reads.

use std::sync::Arc;

use annot_canvas::api::CanvasApi;
use annot_canvas::client::{canvas_http_client, CanvasFeed};
use annot_canvas::endpoint::CanvasEndpoint;
use annot_pipeline::supervisor::ReconnectConfig;
use annot_pipeline::{AnnotationPipeline, PipelineConfig};
use annot_vision::{VisionClient, MAX_LABELS};
use annot_worker::config::WorkerConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "annot_worker=info,annot_pipeline=info,annot_canvas=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        canvas_id = %config.canvas_id,
        api_url = %config.canvas_api_url,
        reconnect_delay_secs = config.reconnect_delay.as_secs(),
        "Starting annot-worker",
    );

    let http = canvas_http_client().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let endpoint = CanvasEndpoint::new(
        &config.canvas_api_url,
        &config.canvas_id,
        &config.canvas_api_token,
    );
    let canvas = Arc::new(CanvasApi::with_client(http.clone(), endpoint.clone()));
    let feed = Arc::new(CanvasFeed::with_client(http, endpoint));

    let detector = VisionClient::new(&config.vision_api_url, &config.vision_api_key)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build label service client");
            std::process::exit(1);
        });

    let pipeline = AnnotationPipeline::start(
        canvas,
        Arc::new(detector),
        PipelineConfig {
            reconnect: ReconnectConfig {
                delay: config.reconnect_delay,
            },
            max_labels: MAX_LABELS,
            archive_dir: config.image_archive_dir.clone(),
        },
    );

    let err = pipeline.run(feed).await;
    tracing::error!(error = %err, "Canvas feed terminated");
    std::process::exit(1);
}
