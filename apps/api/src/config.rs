use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_OCR_ENGINE: &str = "/usr/bin/tesseract";
const DEFAULT_RASTERIZER: &str = "/usr/bin/pdftoppm";
const RASTERIZER_BINARY: &str = "pdftoppm";

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ocr_engine_path: PathBuf,
    pub rasterizer_path: PathBuf,
    pub ocr_concurrency: usize,
    pub max_pdf_pages: u32,
    /// Accepted and logged. Documents are not cancelled when it elapses.
    pub document_timeout_secs: u64,
    /// Accepted and logged. Batches are not split into chunks.
    pub chunk_size: usize,
    pub ocr_language: String,
    pub vocabulary_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rasterizer = lookup("RASTERIZER_PATH").unwrap_or_else(|| DEFAULT_RASTERIZER.into());

        Ok(Config {
            ocr_engine_path: lookup("OCR_ENGINE_PATH")
                .unwrap_or_else(|| DEFAULT_OCR_ENGINE.into())
                .into(),
            rasterizer_path: resolve_rasterizer(PathBuf::from(rasterizer)),
            ocr_concurrency: parse_or(&lookup, "OCR_CONCURRENCY", default_concurrency())?,
            max_pdf_pages: parse_or(&lookup, "MAX_PDF_PAGES", 50)?,
            document_timeout_secs: parse_or(&lookup, "DOCUMENT_TIMEOUT_SECS", 300)?,
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", 10)?,
            ocr_language: lookup("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
            vocabulary_path: lookup("VOCABULARY_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// A directory (e.g. a poppler `bin/`) resolves to the `pdftoppm` inside it.
fn resolve_rasterizer(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path.join(RASTERIZER_BINARY)
    } else {
        path
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.ocr_engine_path, PathBuf::from("/usr/bin/tesseract"));
        assert_eq!(config.max_pdf_pages, 50);
        assert_eq!(config.document_timeout_secs, 300);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.vocabulary_path, None);
        assert_eq!(config.max_upload_bytes, 52_428_800);
        assert_eq!(config.port, 8080);
        assert!((1..=4).contains(&config.ocr_concurrency));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OCR_CONCURRENCY", "2"),
            ("MAX_PDF_PAGES", " 10 "),
            ("OCR_LANGUAGE", "deu"),
            ("VOCABULARY_PATH", "/etc/skills.json"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.ocr_concurrency, 2);
        assert_eq!(config.max_pdf_pages, 10);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.vocabulary_path, Some(PathBuf::from("/etc/skills.json")));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = config_from(&[("MAX_PDF_PAGES", "fifty")]).unwrap_err();
        assert!(err.to_string().contains("MAX_PDF_PAGES"));
        assert!(config_from(&[("PORT", "70000")]).is_err());
    }

    #[test]
    fn test_rasterizer_directory_resolves_to_binary() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_from(&[("RASTERIZER_PATH", dir.path().to_str().unwrap())]).unwrap();
        assert_eq!(config.rasterizer_path, dir.path().join("pdftoppm"));

        let config = config_from(&[("RASTERIZER_PATH", "/opt/poppler/pdftoppm")]).unwrap();
        assert_eq!(config.rasterizer_path, PathBuf::from("/opt/poppler/pdftoppm"));
    }
}
