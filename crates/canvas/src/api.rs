//! REST client for the canvas HTTP endpoints.
//!
//! Wraps note listing, note creation and image download using
//! [`reqwest`]. The pipeline talks to it through the [`CanvasService`]
//! trait so tests can substitute an in-memory canvas.

use annot_core::types::{ExistingNote, NewNote};
use async_trait::async_trait;

use crate::endpoint::{CanvasEndpoint, TOKEN_HEADER};

/// Canvas operations the annotation stages depend on.
#[async_trait]
pub trait CanvasService: Send + Sync {
    /// Fetch every note currently on the canvas.
    async fn list_notes(&self) -> Result<Vec<ExistingNote>, CanvasApiError>;

    /// Create a note. Any 2xx response counts as success.
    async fn create_note(&self, note: &NewNote) -> Result<(), CanvasApiError>;

    /// Download the binary content of an image widget.
    async fn download_image(&self, image_id: &str) -> Result<Vec<u8>, CanvasApiError>;
}

/// HTTP client for a single canvas.
pub struct CanvasApi {
    client: reqwest::Client,
    endpoint: CanvasEndpoint,
}

/// Errors from the canvas REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum CanvasApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The canvas returned a non-2xx status code.
    #[error("Canvas API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl CanvasApi {
    pub fn new(endpoint: CanvasEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (the feed and the REST calls can share one connection pool).
    pub fn with_client(client: reqwest::Client, endpoint: CanvasEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &CanvasEndpoint {
        &self.endpoint
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`CanvasApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CanvasApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CanvasApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CanvasApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), CanvasApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CanvasService for CanvasApi {
    async fn list_notes(&self) -> Result<Vec<ExistingNote>, CanvasApiError> {
        let response = self
            .client
            .get(self.endpoint.notes_url())
            .header(TOKEN_HEADER, self.endpoint.token())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn create_note(&self, note: &NewNote) -> Result<(), CanvasApiError> {
        let response = self
            .client
            .post(self.endpoint.notes_url())
            .header(TOKEN_HEADER, self.endpoint.token())
            .json(note)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn download_image(&self, image_id: &str) -> Result<Vec<u8>, CanvasApiError> {
        let response = self
            .client
            .get(self.endpoint.image_download_url(image_id))
            .header(TOKEN_HEADER, self.endpoint.token())
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
