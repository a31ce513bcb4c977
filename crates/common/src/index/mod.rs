//! Vector index lifecycle
//!
//! Provides:
//! - Index build: chunk documents, embed chunks, persist
//! - Index load with compatibility checks
//! - Load-or-build: rebuild from the store when the persisted index is unusable
//! - Retrieval wrapper (`VectorRetriever`)

pub mod chunker;
mod storage;
mod vector;

pub use chunker::{chunk_text, ChunkingConfig, TextChunk};
pub use storage::{DOCSTORE_FILE, MANIFEST_FILE, VECTOR_STORE_FILE};
pub use vector::{cosine_similarity, RetrievedChunk, RetrievedContext, Retriever, VectorRetriever};

use crate::config::IndexConfig;
use crate::db::RecordSource;
use crate::documents::{build_documents, DocumentMetadata, IndexedDocument};
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Version of the on-disk layout
pub const FORMAT_VERSION: u32 = 1;

/// Namespace for deterministic node ids
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_53c2_8d4e_4b7a_9c31_d2e8_0f5b_a7c4);

/// Manifest describing a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embed_model: String,
    pub dimension: usize,
    pub node_count: usize,
    /// SHA-256 over node ids and texts
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// One embedded chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexNode {
    pub id: Uuid,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

/// An embedded, queryable set of chunks
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    manifest: IndexManifest,
    nodes: Vec<IndexNode>,
}

impl VectorIndex {
    fn new(embed_model: &str, dimension: usize, nodes: Vec<IndexNode>) -> Self {
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embed_model: embed_model.to_string(),
            dimension,
            node_count: nodes.len(),
            fingerprint: fingerprint(&nodes),
            built_at: Utc::now(),
        };
        Self { manifest, nodes }
    }

    fn from_parts(manifest: IndexManifest, nodes: Vec<IndexNode>) -> Self {
        Self { manifest, nodes }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn nodes(&self) -> &[IndexNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_count_matches(&self) -> bool {
        self.manifest.node_count == self.nodes.len()
    }

    fn fingerprint_matches(&self) -> bool {
        self.manifest.fingerprint == fingerprint(&self.nodes)
    }
}

fn fingerprint(nodes: &[IndexNode]) -> String {
    let mut hasher = Sha256::new();
    for node in nodes {
        hasher.update(node.id.as_bytes());
        hasher.update(node.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn node_id(document_id: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(&NODE_NAMESPACE, format!("{}#{}", document_id, chunk_index).as_bytes())
}

/// Builds, persists and reloads the vector index
pub struct IndexStore {
    persist_dir: PathBuf,
    chunking: ChunkingConfig,
    top_k: usize,
    embedder: Arc<dyn Embedder>,
}

impl IndexStore {
    pub fn new(config: &IndexConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            persist_dir: config.persist_dir.clone(),
            chunking: ChunkingConfig::from_tokens(config.chunk_size),
            top_k: config.similarity_top_k,
            embedder,
        }
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Whether something exists at the persist path (loadable or not)
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.persist_dir).await.unwrap_or(false)
    }

    /// Embed `documents` and persist the resulting index
    pub async fn build(&self, documents: &[IndexedDocument]) -> Result<VectorIndex> {
        let start = Instant::now();

        let mut nodes: Vec<IndexNode> = Vec::new();
        for doc in documents {
            for chunk in chunk_text(&doc.text, &self.chunking) {
                nodes.push(IndexNode {
                    id: node_id(&doc.id, chunk.index),
                    document_id: doc.id.clone(),
                    chunk_index: chunk.index,
                    text: chunk.content,
                    metadata: doc.metadata.clone(),
                    embedding: Vec::new(),
                });
            }
        }

        if !nodes.is_empty() {
            let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != nodes.len() {
                return Err(AppError::EmbeddingError {
                    message: format!(
                        "Expected {} embeddings, got {}",
                        nodes.len(),
                        embeddings.len()
                    ),
                });
            }
            for (node, embedding) in nodes.iter_mut().zip(embeddings) {
                node.embedding = embedding;
            }
        }

        let index = VectorIndex::new(self.embedder.model_name(), self.embedder.dimension(), nodes);
        storage::write_index(&self.persist_dir, &index).await?;

        let elapsed = start.elapsed();
        metrics::record_index_build(elapsed.as_secs_f64(), documents.len(), index.len());
        info!(
            documents = documents.len(),
            nodes = index.len(),
            path = %self.persist_dir.display(),
            duration_ms = elapsed.as_millis() as u64,
            "Index built and saved"
        );

        Ok(index)
    }

    /// Load the persisted index
    ///
    /// Fails with `IndexUnreadable` when the directory is missing, damaged,
    /// or was built by a different embedder.
    pub async fn load(&self) -> Result<VectorIndex> {
        let index = storage::read_index(&self.persist_dir).await?;

        let manifest = index.manifest();
        if manifest.embed_model != self.embedder.model_name()
            || manifest.dimension != self.embedder.dimension()
        {
            return Err(AppError::index_unreadable(
                &self.persist_dir,
                format!(
                    "built with {} ({} dims), configured embedder is {} ({} dims)",
                    manifest.embed_model,
                    manifest.dimension,
                    self.embedder.model_name(),
                    self.embedder.dimension()
                ),
            ));
        }

        info!(
            nodes = index.len(),
            path = %self.persist_dir.display(),
            "Index loaded"
        );
        Ok(index)
    }

    /// Extract records, build documents and build the index
    pub async fn rebuild_from(&self, source: &dyn RecordSource) -> Result<VectorIndex> {
        let records = source.extract().await?;
        let documents = build_documents(&records);
        self.build(&documents).await
    }

    /// Load the persisted index, rebuilding it from `source` when unusable
    pub async fn load_or_build(&self, source: &dyn RecordSource) -> Result<VectorIndex> {
        match self.load().await {
            Ok(index) => {
                metrics::record_index_load(true);
                Ok(index)
            }
            Err(e) if e.is_recoverable_index_error() => {
                metrics::record_index_load(false);
                warn!(error = %e, "No usable index found, building a new one");
                self.rebuild_from(source).await
            }
            Err(e) => Err(e),
        }
    }

    /// Wrap an index with the retrieval interface
    pub fn as_queryable(&self, index: VectorIndex) -> VectorRetriever {
        VectorRetriever::new(Arc::new(index), self.embedder.clone(), self.top_k)
    }
}
