//! Runs one task per document and collects the results in submission order.
//!
//! Each document runs inside its own spawned task, so a panic or an
//! `ExtractionError` ends up in that document's `FileResult.error` and never
//! reaches its siblings. The batch call itself cannot fail.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::analysis::personal_info::PersonalInfo;
use crate::pipeline::document::{Document, DocumentPipeline};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub filename: String,
    pub personal_info: PersonalInfo,
    pub skills: Vec<String>,
    pub processing_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    fn failed(filename: String, error: String, seconds: f64) -> Self {
        Self {
            filename,
            personal_info: PersonalInfo::default(),
            skills: Vec::new(),
            processing_time_seconds: round2(seconds),
            error: Some(error),
        }
    }

    /// Files with at least one skill. A document with no skills counts as
    /// failed even when nothing went wrong.
    pub fn is_successful(&self) -> bool {
        !self.skills.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub total_unique_skills: usize,
    /// Wall time of the whole batch.
    pub total_processing_time_seconds: f64,
    /// Mean of the per-file times.
    pub average_file_processing_time_seconds: f64,
    pub individual_file_times: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub results: Vec<FileResult>,
    pub skills: Vec<String>,
    pub processing_stats: ProcessingStats,
}

#[derive(Clone)]
pub struct BatchOrchestrator {
    pipeline: Arc<DocumentPipeline>,
}

impl BatchOrchestrator {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn process_batch(&self, documents: Vec<Document>) -> BatchResult {
        let started = Instant::now();
        info!(files = documents.len(), "Processing batch");

        let handles: Vec<_> = documents
            .into_iter()
            .map(|document| {
                let filename = document.filename.clone();
                (filename, tokio::spawn(process_document(self.pipeline.clone(), document)))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (filename, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let message = join_error_message(e);
                    error!(%filename, "Document task aborted: {message}");
                    FileResult::failed(filename, message, 0.0)
                }
            };
            results.push(result);
        }

        let batch = aggregate(results, started.elapsed().as_secs_f64());
        log_summary(&batch);
        batch
    }
}

/// Runs the pipeline for one document in a nested task so a panic anywhere in
/// it is caught here, with the elapsed time still measured.
async fn process_document(pipeline: Arc<DocumentPipeline>, document: Document) -> FileResult {
    let started = Instant::now();
    let filename = document.filename.clone();
    info!(%filename, "Starting file processing");

    let outcome = tokio::spawn(async move { pipeline.run(&document).await })
        .await
        .map_err(join_error_message)
        .and_then(|run| run.map_err(|e| e.to_string()));
    let seconds = started.elapsed().as_secs_f64();

    match outcome {
        Ok(output) => {
            info!(%filename, "Processing completed in {seconds:.2} seconds");
            FileResult {
                filename,
                personal_info: output.personal_info,
                skills: output.skills,
                processing_time_seconds: round2(seconds),
                error: None,
            }
        }
        Err(message) => {
            error!(%filename, "Processing failed after {seconds:.2} seconds: {message}");
            FileResult::failed(filename, message, seconds)
        }
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return format!("document task cancelled: {e}");
    }
    let payload = e.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("document task panicked: {detail}")
}

fn aggregate(results: Vec<FileResult>, wall_seconds: f64) -> BatchResult {
    let skills: BTreeSet<&String> = results.iter().flat_map(|r| &r.skills).collect();
    let skills: Vec<String> = skills.into_iter().cloned().collect();

    let successful_files = results.iter().filter(|r| r.is_successful()).count();
    let file_seconds: f64 = results.iter().map(|r| r.processing_time_seconds).sum();
    let average = if results.is_empty() {
        0.0
    } else {
        file_seconds / results.len() as f64
    };

    let processing_stats = ProcessingStats {
        total_files: results.len(),
        successful_files,
        failed_files: results.len() - successful_files,
        total_unique_skills: skills.len(),
        total_processing_time_seconds: round2(wall_seconds),
        average_file_processing_time_seconds: round2(average),
        individual_file_times: results
            .iter()
            .map(|r| (r.filename.clone(), r.processing_time_seconds))
            .collect(),
    };

    BatchResult {
        results,
        skills,
        processing_stats,
    }
}

fn log_summary(batch: &BatchResult) {
    let stats = &batch.processing_stats;
    info!("BATCH PROCESSING SUMMARY");
    info!("Total files: {}", stats.total_files);
    info!("Successful: {}", stats.successful_files);
    info!("Failed: {}", stats.failed_files);
    info!("Unique skills found: {}", stats.total_unique_skills);
    info!("Total time: {:.2} seconds", stats.total_processing_time_seconds);
    info!(
        "Average time per file: {:.2} seconds",
        stats.average_file_processing_time_seconds
    );
    for result in &batch.results {
        let status = if result.is_successful() { "OK" } else { "FAILED" };
        info!(
            "  [{status}] {}: {} skills, {:.2}s",
            result.filename,
            result.skills.len(),
            result.processing_time_seconds
        );
    }
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
