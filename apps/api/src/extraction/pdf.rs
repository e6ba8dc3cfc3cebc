//! PDF text extraction: reads the embedded text layer first and only runs OCR
//! when that comes up short.
//!
//! State machine:
//! 1. Direct: read the text layer page by page (capped at `max_pages`). Any
//!    failure degrades to empty text.
//! 2. Decision: trimmed direct text longer than `DIRECT_TEXT_THRESHOLD` chars
//!    is final; OCR is never invoked.
//! 3. OCR: rasterize (300 dpi, grayscale) and recognize page by page on the
//!    `RecognitionPool`. Each page image is released right after recognition;
//!    recognized raster files are swept every `RECLAIM_INTERVAL` pages.
//! 4. Both empty: empty text, logged as a warning.
//!
//! `extract` never fails; errors are handled at the stage boundary.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use lopdf::Document;
use tracing::{debug, info, warn};

use crate::extraction::ocr::{
    RasterizedPages, Rasterizer, RecognitionPool, RecognitionSettings, Recognizer, OCR_DPI,
};
use crate::extraction::temp::TempArtifact;
use crate::extraction::{ExtractedText, ExtractionError, ExtractionMethod};

/// Direct text must exceed this many characters (after trimming) to skip OCR.
pub const DIRECT_TEXT_THRESHOLD: usize = 100;
/// Recognized raster files are swept from disk every this many pages.
pub const RECLAIM_INTERVAL: usize = 5;

/// Reads the embedded text layer of a PDF, one string per page.
pub trait TextLayerReader: Send + Sync {
    fn read_pages(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<String>, ExtractionError>;
}

/// `lopdf` page-by-page reader. Falls back to `pdf-extract` on the whole
/// document when `lopdf` cannot parse the file.
pub struct LopdfTextLayer;

impl TextLayerReader for LopdfTextLayer {
    fn read_pages(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<String>, ExtractionError> {
        let document = match Document::load_mem(pdf) {
            Ok(document) => document,
            Err(e) => {
                debug!("lopdf could not load document ({e}), trying pdf-extract");
                return whole_document_text(pdf).map(|text| vec![text]);
            }
        };

        let mut pages = Vec::new();
        for (page_number, _) in document.get_pages().into_iter().take(max_pages) {
            let text = document
                .extract_text(&[page_number])
                .map_err(|e| ExtractionError::Pdf(format!("page {page_number}: {e}")))?;
            pages.push(text);
        }
        Ok(pages)
    }
}

fn whole_document_text(pdf: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(pdf))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractionError::Pdf(e.to_string())),
        Err(_) => Err(ExtractionError::Pdf("pdf-extract panicked".to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub max_pages: u32,
    pub dpi: u32,
    pub recognition: RecognitionSettings,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            max_pages: 50,
            dpi: OCR_DPI,
            recognition: RecognitionSettings::default(),
        }
    }
}

#[derive(Clone)]
pub struct PdfExtractor {
    text_layer: Arc<dyn TextLayerReader>,
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn Recognizer>,
    pool: RecognitionPool,
    settings: PdfSettings,
}

impl PdfExtractor {
    pub fn new(
        text_layer: Arc<dyn TextLayerReader>,
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn Recognizer>,
        pool: RecognitionPool,
        settings: PdfSettings,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            recognizer,
            pool,
            settings,
        }
    }

    pub async fn extract(&self, content: Bytes) -> ExtractedText {
        info!(bytes = content.len(), "Starting dual PDF extraction");

        let direct = match self.direct_stage(content.clone()).await {
            Ok(text) => {
                info!(chars = text.chars().count(), "Direct extraction finished");
                text
            }
            Err(e) => {
                info!("Direct extraction failed: {e}");
                String::new()
            }
        };

        let direct = direct.trim();
        if direct.chars().count() > DIRECT_TEXT_THRESHOLD {
            info!("Using direct text extraction (text-based PDF)");
            return ExtractedText::new(direct, ExtractionMethod::Direct);
        }

        info!("Direct extraction insufficient, trying OCR for scanned PDF");
        let ocr = match self.ocr_stage(content).await {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR extraction failed: {e}");
                String::new()
            }
        };

        let ocr = ocr.trim();
        if ocr.is_empty() {
            warn!("No text extracted from PDF using either method");
        } else {
            info!(chars = ocr.chars().count(), "OCR extraction completed");
        }
        ExtractedText::new(ocr, ExtractionMethod::Ocr)
    }

    async fn direct_stage(&self, content: Bytes) -> Result<String, ExtractionError> {
        let reader = self.text_layer.clone();
        let max_pages = self.settings.max_pages as usize;

        let pages = tokio::task::spawn_blocking(move || reader.read_pages(&content, max_pages))
            .await
            .map_err(|e| ExtractionError::Pdf(format!("text layer task failed: {e}")))??;

        let mut text = String::new();
        for page in pages.iter().filter(|p| !p.trim().is_empty()) {
            text.push_str(page);
            text.push('\n');
        }
        Ok(text)
    }

    async fn ocr_stage(&self, content: Bytes) -> Result<String, ExtractionError> {
        let rasterizer = self.rasterizer.clone();
        let last_page = self.settings.max_pages.max(1);
        let dpi = self.settings.dpi;
        let RasterizedPages { pages, workdir } = self
            .pool
            .run(move || {
                // The rasterizer needs a path; the guard removes the file on every exit.
                let pdf = TempArtifact::file_with(&content, ".pdf")?;
                rasterizer.rasterize(pdf.path(), 1, last_page, dpi, true)
            })
            .await?;
        info!(pages = pages.len(), "PDF converted into image pages for OCR");

        let mut text = String::new();
        let mut recognized: Vec<PathBuf> = Vec::new();

        for (index, page) in pages.into_iter().take(last_page as usize).enumerate() {
            let recognizer = self.recognizer.clone();
            let settings = self.settings.recognition.clone();
            let (page_text, raster_file) = self
                .pool
                .run(move || page.recognize_with(recognizer.as_ref(), &settings))
                .await?;

            debug!(
                page = index + 1,
                chars = page_text.chars().count(),
                "OCR page processed"
            );
            text.push_str(&page_text);
            text.push('\n');

            recognized.extend(raster_file);
            if (index + 1) % RECLAIM_INTERVAL == 0 {
                sweep(&mut recognized);
            }
        }
        sweep(&mut recognized);
        drop(workdir);

        Ok(text)
    }
}

fn sweep(files: &mut Vec<PathBuf>) {
    for path in files.drain(..) {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Could not remove raster page");
        }
    }
}
