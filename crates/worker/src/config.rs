use std::path::PathBuf;
use std::time::Duration;

use annot_pipeline::supervisor::DEFAULT_RECONNECT_DELAY;
use annot_vision::DEFAULT_VISION_URL;

/// Default canvas API root for a local server.
pub const DEFAULT_CANVAS_API_URL: &str = "http://localhost:8090/api/v1";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Canvas API root, e.g. `http://host:8090/api/v1`.
    pub canvas_api_url: String,
    /// Sent as the `Private-Token` header.
    pub canvas_api_token: String,
    /// Canvas whose images are annotated.
    pub canvas_id: String,
    pub vision_api_url: String,
    pub vision_api_key: String,
    /// Wait between feed reconnection attempts.
    pub reconnect_delay: Duration,
    /// Directory receiving a copy of each downloaded image, if any.
    pub image_archive_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `CANVAS_API_URL`       | `http://localhost:8090/api/v1`   |
    /// | `CANVAS_API_TOKEN`     | required                         |
    /// | `CANVAS_ID`            | required                         |
    /// | `VISION_API_URL`       | Google Vision `images:annotate`  |
    /// | `VISION_API_KEY`       | required                         |
    /// | `RECONNECT_DELAY_SECS` | `3`                              |
    /// | `IMAGE_ARCHIVE_DIR`    | unset                            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let reconnect_delay = match optional("RECONNECT_DELAY_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "RECONNECT_DELAY_SECS",
                    expected: "a whole number of seconds",
                    value: value.clone(),
                }
            })?),
            None => DEFAULT_RECONNECT_DELAY,
        };

        Ok(Self {
            canvas_api_url: optional("CANVAS_API_URL")
                .unwrap_or_else(|| DEFAULT_CANVAS_API_URL.to_string()),
            canvas_api_token: required("CANVAS_API_TOKEN")?,
            canvas_id: required("CANVAS_ID")?,
            vision_api_url: optional("VISION_API_URL")
                .unwrap_or_else(|| DEFAULT_VISION_URL.to_string()),
            vision_api_key: required("VISION_API_KEY")?,
            reconnect_delay,
            image_archive_dir: optional("IMAGE_ARCHIVE_DIR").map(PathBuf::from),
        })
    }
}
