//! OCR collaborators: rasterizer, recognizer and the bounded pool they run on.
//!
//! # Collaborators
//! - `Rasterizer`: PDF → page images (`pdftoppm` by default).
//! - `Recognizer`: page image → text (`tesseract` by default).
//!
//! Both are traits so tests can swap in fakes that count calls.
//!
//! # Worker pool
//! Recognition is CPU-bound and blocking. `RecognitionPool` gates
//! `tokio::task::spawn_blocking` behind a semaphore so at most N recognition
//! jobs run at once and the async executor never waits on a subprocess.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::extraction::temp::TempArtifact;
use crate::extraction::ExtractionError;

/// Rasterization resolution for the PDF OCR stage.
pub const OCR_DPI: u32 = 300;

/// Page-segmentation mode passed to the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Assume a single uniform block of text, keep inter-word spacing.
    SingleBlock,
}

impl RecognitionMode {
    fn args(&self) -> &'static [&'static str] {
        match self {
            RecognitionMode::SingleBlock => &["--psm", "6", "-c", "preserve_interword_spaces=1"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    pub language: String,
    pub mode: RecognitionMode,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            mode: RecognitionMode::SingleBlock,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ────────────────────────────────────────────────────────────────────────────

pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<String, ExtractionError>;

    /// Recognizes an image already on disk. The default decodes it and defers
    /// to `recognize`; file-based engines skip the round trip.
    fn recognize_file(
        &self,
        path: &Path,
        settings: &RecognitionSettings,
    ) -> Result<String, ExtractionError> {
        let image = image::open(path)?;
        self.recognize(&image, settings)
    }
}

pub trait Rasterizer: Send + Sync {
    fn rasterize(
        &self,
        pdf_path: &Path,
        first_page: u32,
        last_page: u32,
        dpi: u32,
        grayscale: bool,
    ) -> Result<RasterizedPages, ExtractionError>;
}

/// One rasterized page. The external tool writes pages to disk; tests hand
/// decoded images straight to the recognizer.
pub enum RasterPage {
    File(PathBuf),
    #[cfg(test)]
    Decoded(DynamicImage),
}

impl RasterPage {
    /// Runs recognition and releases the page image. Returns the on-disk file
    /// (if any) so the caller can sweep it.
    pub fn recognize_with(
        self,
        recognizer: &dyn Recognizer,
        settings: &RecognitionSettings,
    ) -> Result<(String, Option<PathBuf>), ExtractionError> {
        match self {
            RasterPage::File(path) => {
                let text = recognizer.recognize_file(&path, settings)?;
                Ok((text, Some(path)))
            }
            #[cfg(test)]
            RasterPage::Decoded(image) => {
                let text = recognizer.recognize(&image, settings)?;
                drop(image);
                Ok((text, None))
            }
        }
    }
}

/// Pages produced by a rasterizer, plus the work directory backing them.
pub struct RasterizedPages {
    pub pages: Vec<RasterPage>,
    pub workdir: Option<TempArtifact>,
}

impl RasterizedPages {
    #[cfg(test)]
    pub fn in_memory(pages: Vec<DynamicImage>) -> Self {
        Self {
            pages: pages.into_iter().map(RasterPage::Decoded).collect(),
            workdir: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Subprocess-backed implementations
// ────────────────────────────────────────────────────────────────────────────

/// Runs the `tesseract` CLI, reading recognized text from stdout.
pub struct TesseractRecognizer {
    binary: PathBuf,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image: &DynamicImage,
        settings: &RecognitionSettings,
    ) -> Result<String, ExtractionError> {
        let scratch = TempArtifact::empty_file(".png")?;
        image.save_with_format(scratch.path(), ImageFormat::Png)?;
        self.recognize_file(scratch.path(), settings)
    }

    fn recognize_file(
        &self,
        path: &Path,
        settings: &RecognitionSettings,
    ) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&settings.language)
            .args(settings.mode.args())
            .output()
            .map_err(|e| {
                ExtractionError::Recognizer(format!(
                    "failed to run '{}': {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Recognizer(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.chars().count(), "Recognizer output");
        Ok(text)
    }
}

/// Runs poppler's `pdftoppm`, writing one PNG per page into a temp work directory.
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        first_page: u32,
        last_page: u32,
        dpi: u32,
        grayscale: bool,
    ) -> Result<RasterizedPages, ExtractionError> {
        let workdir = TempArtifact::dir()?;
        let prefix = workdir.path().join("page");

        let mut command = Command::new(&self.binary);
        command
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(first_page.to_string())
            .arg("-l")
            .arg(last_page.to_string());
        if grayscale {
            command.arg("-gray");
        }
        let output = command.arg(pdf_path).arg(&prefix).output().map_err(|e| {
            ExtractionError::Rasterizer(format!("failed to run '{}': {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Rasterizer(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        // pdftoppm zero-pads page numbers, so lexical order is page order.
        let mut files: Vec<PathBuf> = std::fs::read_dir(workdir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        files.sort();

        Ok(RasterizedPages {
            pages: files.into_iter().map(RasterPage::File).collect(),
            workdir: Some(workdir),
        })
    }
}

/// Returns true when `binary arg` can be spawned. Used for startup diagnostics only.
pub fn probe_binary(binary: &Path, arg: &str) -> bool {
    match Command::new(binary).arg(arg).output() {
        Ok(_) => true,
        Err(e) => {
            warn!(binary = %binary.display(), error = %e, "OCR tool not available");
            false
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bounded worker pool
// ────────────────────────────────────────────────────────────────────────────

/// Runs blocking recognition jobs with at most `size` in flight.
#[derive(Clone)]
pub struct RecognitionPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl RecognitionPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn run<T, F>(&self, job: F) -> Result<T, ExtractionError>
    where
        F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ExtractionError::WorkerPool(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| ExtractionError::WorkerPool(format!("recognition job failed: {e}")))?
    }
}
