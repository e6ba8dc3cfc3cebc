use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::analysis::cleaner::TextCleaner;
use crate::analysis::nlp::NlpService;
use crate::analysis::personal_info::{PersonalInfo, PersonalInfoExtractor};
use crate::analysis::skills::SkillMatcher;
use crate::analysis::truncate_chars;
use crate::extraction::docx;
use crate::extraction::image::ImageExtractor;
use crate::extraction::ocr::{Rasterizer, RecognitionPool, Recognizer};
use crate::extraction::pdf::{PdfExtractor, PdfSettings, TextLayerReader};
use crate::extraction::{DocumentKind, ExtractedText, ExtractionError, ExtractionMethod};
use crate::instrument::{timed, timed_async};
use crate::vocabulary::Vocabulary;

/// One submitted file. Owned by the task processing it.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content: Bytes,
}

impl Document {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_filename(&self.filename)
    }
}

/// External capabilities the extractors depend on.
#[derive(Clone)]
pub struct Collaborators {
    pub text_layer: Arc<dyn TextLayerReader>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub recognizer: Arc<dyn Recognizer>,
    pub pool: RecognitionPool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineOutput {
    pub personal_info: PersonalInfo,
    pub skills: Vec<String>,
    /// `None` when no extractor ran (unsupported type).
    pub method: Option<ExtractionMethod>,
}

pub struct DocumentPipeline {
    pdf: PdfExtractor,
    image: ImageExtractor,
    cleaner: TextCleaner,
    personal_info: PersonalInfoExtractor,
    skills: SkillMatcher,
    nlp: Arc<NlpService>,
}

impl DocumentPipeline {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        nlp: Arc<NlpService>,
        collaborators: Collaborators,
        pdf_settings: PdfSettings,
    ) -> anyhow::Result<Self> {
        let image = ImageExtractor::new(
            collaborators.recognizer.clone(),
            collaborators.pool.clone(),
            pdf_settings.recognition.clone(),
        );
        let pdf = PdfExtractor::new(
            collaborators.text_layer,
            collaborators.rasterizer,
            collaborators.recognizer,
            collaborators.pool,
            pdf_settings,
        );

        Ok(Self {
            pdf,
            image,
            cleaner: TextCleaner::new(&vocabulary).context("Invalid heading vocabulary")?,
            personal_info: PersonalInfoExtractor::new()
                .context("Failed to compile personal info patterns")?,
            skills: SkillMatcher::new(vocabulary).context("Invalid skill vocabulary")?,
            nlp,
        })
    }

    /// Errors returned here are per-document faults. PDF and DOCX failures
    /// have already degraded to empty text inside their extractors.
    pub async fn run(&self, document: &Document) -> Result<PipelineOutput, ExtractionError> {
        let Some(extracted) = self.extract_text(document).await? else {
            return Ok(PipelineOutput::default());
        };

        if extracted.is_blank() {
            warn!(filename = %document.filename, "No text extracted from file");
            return Ok(PipelineOutput {
                method: Some(extracted.method),
                ..Default::default()
            });
        }

        let cleaned = timed("Text Cleaning", || self.cleaner.clean(&extracted.text));
        let personal_info = timed("Personal Info Extraction", || {
            self.personal_info.extract(&cleaned, &self.nlp)
        });
        let skills = timed("Skill Extraction", || self.skills.extract(&cleaned, &self.nlp));

        Ok(PipelineOutput {
            personal_info,
            skills,
            method: Some(extracted.method),
        })
    }

    async fn extract_text(
        &self,
        document: &Document,
    ) -> Result<Option<ExtractedText>, ExtractionError> {
        let content = document.content.clone();
        let extracted = match document.kind() {
            DocumentKind::Pdf => {
                info!(filename = %document.filename, "Handling PDF file");
                let extracted = timed_async("PDF Extraction", self.pdf.extract(content)).await;
                self.log_potential_skills(&extracted.text);
                extracted
            }
            DocumentKind::Docx => {
                info!(filename = %document.filename, "Handling DOCX file");
                timed_async(
                    "DOCX Extraction",
                    run_docx_job(move || docx::extract(&content)),
                )
                .await
            }
            DocumentKind::Image => {
                info!(filename = %document.filename, "Handling image file");
                timed_async("Image OCR", self.image.extract(content)).await?
            }
            DocumentKind::Unsupported => {
                warn!(filename = %document.filename, "Unsupported file type");
                return Ok(None);
            }
        };

        debug!(
            filename = %document.filename,
            method = ?extracted.method,
            sample = truncate_chars(&extracted.text, 200),
            "Extracted text sample"
        );
        Ok(Some(extracted))
    }

    fn log_potential_skills(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let potential = self.skills.potential_skills(text);
        info!(count = potential.len(), "Potential skills detected in text");
        if !potential.is_empty() {
            let sample: Vec<_> = potential.iter().take(5).collect();
            debug!(?sample, "Sample detected skills");
        }
    }
}

/// Runs DOCX parsing off the async workers. A task that dies yields empty
/// text, the same as a document that fails to parse.
async fn run_docx_job<F>(job: F) -> ExtractedText
where
    F: FnOnce() -> ExtractedText + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(extracted) => extracted,
        Err(e) => {
            warn!(error = %e, "DOCX extraction task failed");
            ExtractedText::new("", ExtractionMethod::Docx)
        }
    }
}
