//! Swasya Common Library
//!
//! Shared code for the Swasya consultation query tools:
//! - Consultation store access and record extraction
//! - Document construction from joined records
//! - Embedding client abstraction
//! - Persisted vector index (build / load / load-or-build)
//! - Answer synthesis (generative or heuristic)
//! - Error types, configuration, logging and metrics

pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod embeddings;
pub mod engine;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use crate::context::{AnswerSynthesizer, BackendKind};
pub use crate::db::{JoinedRecord, RecordSource, Repository};
pub use crate::documents::{build_document, IndexedDocument};
pub use crate::embeddings::Embedder;
pub use crate::engine::ConsultationQueryEngine;
pub use crate::errors::{AppError, Result};
pub use crate::index::{IndexStore, VectorIndex, VectorRetriever};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory for the persisted index
pub const DEFAULT_PERSIST_DIR: &str = "./llama_index_storage";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Questions offered to users of the console and the HTTP examples route
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What are the common symptoms across all patients?",
    "List all patients with fever",
    "Show me consultations for AKASH",
    "What medications were prescribed?",
    "Summarize recent consultations",
];
