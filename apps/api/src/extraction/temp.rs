//! Transient on-disk artifacts (temp PDFs, raster work directories).
//!
//! The guard removes its artifact on drop, so every exit path of the owning
//! stage cleans up, including early returns and panics. Deletion failures are
//! logged and never surfaced to the caller.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

enum Artifact {
    File(NamedTempFile),
    Dir(TempDir),
}

pub struct TempArtifact {
    path: PathBuf,
    artifact: Option<Artifact>,
}

impl TempArtifact {
    /// Writes `content` to a fresh temp file with the given suffix (e.g. ".pdf").
    pub fn file_with(content: &[u8], suffix: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("extract-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(content)?;
        file.flush()?;
        Ok(Self::from_file(file))
    }

    /// An empty temp file the caller fills through its path.
    pub fn empty_file(suffix: &str) -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("extract-")
            .suffix(suffix)
            .tempfile()?;
        Ok(Self::from_file(file))
    }

    pub fn dir() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("extract-pages-").tempdir()?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            artifact: Some(Artifact::Dir(dir)),
        })
    }

    fn from_file(file: NamedTempFile) -> Self {
        Self {
            path: file.path().to_path_buf(),
            artifact: Some(Artifact::File(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        let result = match self.artifact.take() {
            Some(Artifact::File(file)) => file.close(),
            Some(Artifact::Dir(dir)) => dir.close(),
            None => return,
        };
        match result {
            Ok(()) => debug!(path = %self.path.display(), "Temp artifact removed"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Could not clean up temp artifact"
            ),
        }
    }
}
