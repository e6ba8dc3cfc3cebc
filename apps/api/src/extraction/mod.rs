// Text extraction: type dispatch plus one extractor per supported document kind.
// Recognition and rasterization run on the bounded RecognitionPool (see ocr.rs).

pub mod docx;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod temp;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF text layer error: {0}")]
    Pdf(String),

    #[error("DOCX parse error: {0}")]
    Docx(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] ::image::ImageError),

    #[error("Rasterizer error: {0}")]
    Rasterizer(String),

    #[error("Recognizer error: {0}")]
    Recognizer(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Document type inferred from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
    Unsupported,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => DocumentKind::Pdf,
            Some("docx") => DocumentKind::Docx,
            Some("png" | "jpg" | "jpeg") => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Direct,
    Ocr,
    Docx,
    Image,
}

/// Raw text produced by an extractor. Missing text is an empty string, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>, method: ExtractionMethod) -> Self {
        Self {
            text: text.into(),
            method,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_supported_extensions() {
        assert_eq!(DocumentKind::from_filename("cv.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("cv.docx"), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_filename("scan.png"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("scan.jpg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_filename("scan.jpeg"), DocumentKind::Image);
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        assert_eq!(DocumentKind::from_filename("CV.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("Resume.DocX"), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_filename("photo.JPEG"), DocumentKind::Image);
    }

    #[test]
    fn test_dispatch_unsupported() {
        assert_eq!(DocumentKind::from_filename("notes.txt"), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::from_filename("legacy.doc"), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::from_filename("pdf"), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::from_filename(""), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::from_filename("archive.pdf.zip"), DocumentKind::Unsupported);
    }

    #[test]
    fn test_extracted_text_blank() {
        assert!(ExtractedText::new("", ExtractionMethod::Ocr).is_blank());
        assert!(ExtractedText::new(" \n\t", ExtractionMethod::Direct).is_blank());
        assert!(!ExtractedText::new("Python", ExtractionMethod::Docx).is_blank());
    }
}
