//! Text chunking module
//!
//! Splits document text into chunks for embedding.

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Approximate characters per token
pub const CHARS_PER_TOKEN: usize = 4;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
}

impl ChunkingConfig {
    /// Chunking for a token budget, at roughly four characters per token
    pub fn from_tokens(tokens: usize) -> Self {
        Self {
            chunk_size: tokens.saturating_mul(CHARS_PER_TOKEN).max(1),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from_tokens(512)
    }
}

/// A text chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document
    pub index: usize,
}

/// Split text into chunks for embedding
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let splitter = TextSplitter::new(ChunkConfig::new(config.chunk_size.max(1)));

    let chunks: Vec<TextChunk> = splitter
        .chunks(text)
        .filter(|c| !c.trim().is_empty())
        .enumerate()
        .map(|(index, content)| TextChunk {
            content: content.to_string(),
            index,
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        "Text chunked"
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_document_is_one_chunk() {
        let text = "Patient: Asha\nAge: 34\nTranscript: fever";
        let chunks = chunk_text(text, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_long_text_respects_chunk_size() {
        let text = "This is a test. ".repeat(100);
        let config = ChunkingConfig { chunk_size: 200 };

        let chunks = chunk_text(&text, &config);
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.content.chars().count() <= config.chunk_size);
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", &ChunkingConfig::default());
        assert!(chunks.is_empty());
    }
}
