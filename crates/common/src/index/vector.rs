//! Vector similarity retrieval over a loaded index
//!
//! Provides semantic search via cosine similarity between the question
//! embedding and every stored node embedding.

use super::VectorIndex;
use crate::documents::DocumentMetadata;
use crate::embeddings::Embedder;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// Retrieved chunk with relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Node ID
    pub node_id: Uuid,

    /// Consultation this chunk was cut from
    pub document_id: String,

    /// Chunk content, verbatim
    pub content: String,

    /// Parent document metadata
    pub metadata: DocumentMetadata,

    /// Cosine similarity to the question
    pub score: f32,
}

/// Chunks retrieved for one question, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievedContext {
    /// Chunk texts joined with a blank line
    pub fn text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Common trait for retrievers
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve the chunks most relevant to a question
    async fn retrieve(&self, question: &str) -> Result<RetrievedContext>;
}

/// Vector retriever over an in-memory index
pub struct VectorRetriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl VectorRetriever {
    /// Create a new vector retriever
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { index, embedder, top_k }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, question: &str) -> Result<RetrievedContext> {
        if self.index.is_empty() {
            return Ok(RetrievedContext::default());
        }

        let embedding = self.embedder.embed(question).await?;
        Ok(self.index.search(&embedding, self.top_k))
    }
}

impl VectorIndex {
    /// Rank every node against a query embedding and keep the best `top_k`.
    /// Ties keep index order.
    pub fn search(&self, embedding: &[f32], top_k: usize) -> RetrievedContext {
        let mut scored: Vec<(usize, f32)> = self
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| (i, cosine_similarity(embedding, &node.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        let chunks = scored
            .into_iter()
            .map(|(i, score)| {
                let node = &self.nodes()[i];
                RetrievedChunk {
                    node_id: node.id,
                    document_id: node.document_id.clone(),
                    content: node.text.clone(),
                    metadata: node.metadata.clone(),
                    score,
                }
            })
            .collect();

        RetrievedContext { chunks }
    }
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_context_text_joins_chunks() {
        let chunk = |content: &str| RetrievedChunk {
            node_id: Uuid::nil(),
            document_id: "c".to_string(),
            content: content.to_string(),
            metadata: DocumentMetadata {
                uhid: None,
                patient_name: None,
                age: None,
                date: "N/A".to_string(),
            },
            score: 0.5,
        };

        let context = RetrievedContext {
            chunks: vec![chunk("Patient: A"), chunk("Patient: B")],
        };
        assert_eq!(context.text(), "Patient: A\n\nPatient: B");
        assert_eq!(context.len(), 2);
        assert!(RetrievedContext::default().is_empty());
    }
}
