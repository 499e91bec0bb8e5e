//! Label detection over a Google-Vision-compatible `images:annotate`
//! endpoint.
//!
//! [`VisionClient`] sends the image inline as base64 and asks for
//! `LABEL_DETECTION`. Label descriptions come back ranked by score.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Upper bound on labels requested per image.
pub const MAX_LABELS: usize = 10;

/// Public Vision API annotate endpoint.
pub const DEFAULT_VISION_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

/// HTTP request timeout for a single annotate call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Turns image bytes into ranked text labels.
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Return at most `max_results` label descriptions, best first.
    async fn detect_labels(
        &self,
        image: &[u8],
        max_results: usize,
    ) -> Result<Vec<String>, LabelError>;
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for label detection failures.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Label service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The service accepted the request but reported a per-image error.
    #[error("Label service error {code}: {message}")]
    Service { code: i32, message: String },

    /// The response did not contain a result for the submitted image.
    #[error("Malformed label service response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    error: Option<ServiceStatus>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

fn build_request(image: &[u8], max_results: usize) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![ImageRequest {
            image: ImageContent {
                content: base64::engine::general_purpose::STANDARD.encode(image),
            },
            features: vec![Feature {
                kind: "LABEL_DETECTION",
                max_results,
            }],
        }],
    }
}

fn labels_from_response(
    response: AnnotateResponse,
    max_results: usize,
) -> Result<Vec<String>, LabelError> {
    let image = response.responses.into_iter().next().ok_or_else(|| {
        LabelError::MalformedResponse("no response for the submitted image".to_string())
    })?;

    if let Some(status) = image.error {
        return Err(LabelError::Service {
            code: status.code,
            message: status.message,
        });
    }

    Ok(image
        .label_annotations
        .into_iter()
        .map(|label| label.description)
        .take(max_results)
        .collect())
}

// ---------------------------------------------------------------------------
// VisionClient
// ---------------------------------------------------------------------------

/// HTTP client for the annotate endpoint, authenticated by API key.
pub struct VisionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LabelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl LabelDetector for VisionClient {
    async fn detect_labels(
        &self,
        image: &[u8],
        max_results: usize,
    ) -> Result<Vec<String>, LabelError> {
        let body = build_request(image, max_results);

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LabelError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnnotateResponse = response.json().await?;
        let labels = labels_from_response(parsed, max_results)?;
        tracing::debug!(
            image_bytes = image.len(),
            label_count = labels.len(),
            "Label detection complete",
        );
        Ok(labels)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
