mod analysis;
mod config;
mod errors;
mod extraction;
mod instrument;
mod pipeline;
mod routes;
mod state;
mod vocabulary;

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::nlp::NlpService;
use crate::config::Config;
use crate::extraction::ocr::{
    probe_binary, PdftoppmRasterizer, RecognitionPool, RecognitionSettings, TesseractRecognizer,
    OCR_DPI,
};
use crate::extraction::pdf::{LopdfTextLayer, PdfSettings};
use crate::pipeline::{BatchOrchestrator, Collaborators, DocumentPipeline};
use crate::routes::build_router;
use crate::state::AppState;
use crate::vocabulary::Vocabulary;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Extract API v{}", env!("CARGO_PKG_VERSION"));

    check_ocr_tools(&config);

    let vocabulary = Arc::new(Vocabulary::load(config.vocabulary_path.as_deref())?);
    let nlp = Arc::new(NlpService::rule_based(vocabulary.clone()));

    let pool = RecognitionPool::new(config.ocr_concurrency);
    info!(workers = pool.size(), "Recognition pool initialized");

    let collaborators = Collaborators {
        text_layer: Arc::new(LopdfTextLayer),
        rasterizer: Arc::new(PdftoppmRasterizer::new(&config.rasterizer_path)),
        recognizer: Arc::new(TesseractRecognizer::new(&config.ocr_engine_path)),
        pool,
    };
    let pdf_settings = PdfSettings {
        max_pages: config.max_pdf_pages,
        dpi: OCR_DPI,
        recognition: RecognitionSettings {
            language: config.ocr_language.clone(),
            ..RecognitionSettings::default()
        },
    };

    let pipeline = DocumentPipeline::new(vocabulary, nlp, collaborators, pdf_settings)?;
    let orchestrator = Arc::new(BatchOrchestrator::new(Arc::new(pipeline)));

    info!(
        "Document timeout: {}s (not enforced), chunk size: {} (not used)",
        config.document_timeout_secs, config.chunk_size
    );

    let state = AppState {
        orchestrator,
        config: config.clone(),
    };

    // Build router
    let app: Router = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Logs whether the recognizer and rasterizer binaries can be launched.
/// Missing tools only disable the OCR paths; startup continues.
fn check_ocr_tools(config: &Config) {
    let ocr_ok = probe_binary(&config.ocr_engine_path, "--version");
    let rasterizer_ok = probe_binary(&config.rasterizer_path, "-v");

    if ocr_ok && rasterizer_ok {
        info!(
            ocr = %config.ocr_engine_path.display(),
            rasterizer = %config.rasterizer_path.display(),
            "OCR tools available"
        );
    } else {
        warn!("OCR tools missing; scanned PDFs will yield no text and image uploads will fail");
    }
}
