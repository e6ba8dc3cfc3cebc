use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use tracing::debug;

use crate::extraction::ocr::{RecognitionPool, RecognitionSettings, Recognizer};
use crate::extraction::{ExtractedText, ExtractionError, ExtractionMethod};

/// Decodes a PNG/JPEG and normalizes it to 8-bit RGB before recognition.
pub fn decode_rgb(bytes: &[u8]) -> Result<DynamicImage, ExtractionError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// Single-image OCR. Decode and recognition both run on the recognition pool.
///
/// Unlike the PDF stages, failures here are returned to the caller.
#[derive(Clone)]
pub struct ImageExtractor {
    recognizer: Arc<dyn Recognizer>,
    pool: RecognitionPool,
    settings: RecognitionSettings,
}

impl ImageExtractor {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        pool: RecognitionPool,
        settings: RecognitionSettings,
    ) -> Self {
        Self {
            recognizer,
            pool,
            settings,
        }
    }

    pub async fn extract(&self, content: Bytes) -> Result<ExtractedText, ExtractionError> {
        let recognizer = self.recognizer.clone();
        let settings = self.settings.clone();

        let text = self
            .pool
            .run(move || {
                let image = decode_rgb(&content)?;
                recognizer.recognize(&image, &settings)
            })
            .await?;

        debug!(chars = text.chars().count(), "Image OCR text length");
        Ok(ExtractedText::new(text, ExtractionMethod::Image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageFormat};
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRecognizer {
        seen: Mutex<Vec<(ColorType, String)>>,
    }

    impl Recognizer for RecordingRecognizer {
        fn recognize(
            &self,
            image: &DynamicImage,
            settings: &RecognitionSettings,
        ) -> Result<String, ExtractionError> {
            self.seen
                .lock()
                .unwrap()
                .push((image.color(), settings.language.clone()));
            Ok("Email: jane@example.com\nPython".to_string())
        }
    }

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_normalizes_to_rgb() {
        let gray = png_bytes(DynamicImage::new_luma8(3, 3));
        assert_eq!(decode_rgb(&gray).unwrap().color(), ColorType::Rgb8);

        let rgba = png_bytes(DynamicImage::new_rgba8(3, 3));
        assert_eq!(decode_rgb(&rgba).unwrap().color(), ColorType::Rgb8);
    }

    #[tokio::test]
    async fn test_extract_runs_recognizer_on_rgb_image() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let extractor = ImageExtractor::new(
            recognizer.clone(),
            RecognitionPool::new(1),
            RecognitionSettings::default(),
        );

        let out = extractor
            .extract(Bytes::from(png_bytes(DynamicImage::new_luma8(6, 6))))
            .await
            .unwrap();
        assert_eq!(out.method, ExtractionMethod::Image);
        assert_eq!(out.text, "Email: jane@example.com\nPython");
        assert_eq!(
            *recognizer.seen.lock().unwrap(),
            vec![(ColorType::Rgb8, "eng".to_string())]
        );
    }

    #[tokio::test]
    async fn test_undecodable_image_is_an_error() {
        let recognizer = Arc::new(RecordingRecognizer::default());
        let extractor = ImageExtractor::new(
            recognizer.clone(),
            RecognitionPool::new(1),
            RecognitionSettings::default(),
        );

        let err = extractor
            .extract(Bytes::from_static(b"not an image"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ImageDecode(_)));
        assert!(recognizer.seen.lock().unwrap().is_empty());
    }
}
