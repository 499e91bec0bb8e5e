//! Addressing and credentials for one canvas.

/// Request header carrying the API token on every canvas call.
pub const TOKEN_HEADER: &str = "Private-Token";

/// Base URL, canvas id and token shared by the REST client and the feed.
#[derive(Debug, Clone)]
pub struct CanvasEndpoint {
    base_url: String,
    canvas_id: String,
    token: String,
}

impl CanvasEndpoint {
    /// * `base_url`  - API root, e.g. `http://host:8090/api/v1`.
    /// * `canvas_id` - canvas whose widgets are mirrored.
    /// * `token`     - value of the [`TOKEN_HEADER`] header.
    pub fn new(
        base_url: impl Into<String>,
        canvas_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            canvas_id: canvas_id.into(),
            token: token.into(),
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn canvas_url(&self) -> String {
        format!("{}/canvases/{}", self.base_url, self.canvas_id)
    }

    /// `GET` target of the long-lived image feed.
    pub fn subscribe_url(&self) -> String {
        format!("{}/images?subscribe", self.canvas_url())
    }

    /// Listing and creation target for notes.
    pub fn notes_url(&self) -> String {
        format!("{}/notes", self.canvas_url())
    }

    pub fn image_download_url(&self, image_id: &str) -> String {
        format!("{}/images/{}/download", self.canvas_url(), image_id)
    }
}
