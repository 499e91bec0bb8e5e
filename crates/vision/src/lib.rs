//! Label-detection service client.

pub mod client;

pub use client::{LabelDetector, LabelError, VisionClient, DEFAULT_VISION_URL, MAX_LABELS};
