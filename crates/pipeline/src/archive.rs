//! Optional on-disk copy of every downloaded image.

use std::path::{Path, PathBuf};

/// Extension given to archived files; the download carries no file name.
const ARCHIVE_EXTENSION: &str = "jpg";

/// Writes downloaded images to `{dir}/{image_id}.jpg`, never overwriting.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    dir: PathBuf,
}

/// Result of archiving one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Written(PathBuf),
    AlreadyPresent(PathBuf),
}

impl ImageArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` unless a file for `image_id` already exists.
    pub async fn store(&self, image_id: &str, bytes: &[u8]) -> std::io::Result<ArchiveOutcome> {
        if image_id.is_empty()
            || image_id.contains(['/', '\\'])
            || image_id.starts_with('.')
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("image id {image_id:?} is not a safe file name"),
            ));
        }

        let metadata = tokio::fs::metadata(&self.dir).await?;
        if !metadata.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", self.dir.display()),
            ));
        }

        let path = self.dir.join(format!("{image_id}.{ARCHIVE_EXTENSION}"));
        if tokio::fs::try_exists(&path).await? {
            return Ok(ArchiveOutcome::AlreadyPresent(path));
        }

        tokio::fs::write(&path, bytes).await?;
        Ok(ArchiveOutcome::Written(path))
    }
}
