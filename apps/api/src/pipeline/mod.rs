//! Document pipeline: dispatch → extract → clean → personal info + skills,
//! and the batch orchestrator that runs one pipeline task per document.

pub mod batch;
pub mod document;

pub use batch::{BatchOrchestrator, BatchResult};
pub use document::{Collaborators, Document, DocumentPipeline};
