//! On-disk layout of a persisted index
//!
//! ```text
//! <persist_dir>/
//!   index_store.json   manifest
//!   docstore.json      node texts and metadata, in index order
//!   vector_store.json  node id -> embedding
//! ```
//!
//! Writes go to a staging directory next to the target which is then renamed
//! into place, so a reader finds the old index, no index, or the new index.

use super::{IndexManifest, IndexNode, VectorIndex, FORMAT_VERSION};
use crate::documents::DocumentMetadata;
use crate::errors::{AppError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "index_store.json";
pub const DOCSTORE_FILE: &str = "docstore.json";
pub const VECTOR_STORE_FILE: &str = "vector_store.json";

#[derive(Serialize, Deserialize)]
struct DocStore {
    nodes: Vec<StoredNode>,
}

#[derive(Serialize, Deserialize)]
struct StoredNode {
    id: Uuid,
    document_id: String,
    chunk_index: usize,
    text: String,
    metadata: DocumentMetadata,
}

#[derive(Serialize, Deserialize)]
struct VectorStore {
    embeddings: BTreeMap<Uuid, Vec<f32>>,
}

/// Write `index` to `path`, replacing whatever was there
pub async fn write_index(path: &Path, index: &VectorIndex) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::index_write(path, e))?;
    }

    let staging = sibling(path, "staging");
    fs::create_dir_all(&staging)
        .await
        .map_err(|e| AppError::index_write(path, e))?;

    if let Err(e) = write_files(&staging, index).await {
        let _ = fs::remove_dir_all(&staging).await;
        return Err(AppError::index_write(path, e));
    }

    let backup = if fs::try_exists(path).await.unwrap_or(false) {
        let backup = sibling(path, "old");
        fs::rename(path, &backup)
            .await
            .map_err(|e| AppError::index_write(path, e))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(&staging, path).await {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, path).await;
        }
        let _ = fs::remove_dir_all(&staging).await;
        return Err(AppError::index_write(path, e));
    }

    if let Some(backup) = backup {
        if let Err(e) = fs::remove_dir_all(&backup).await {
            warn!(path = %backup.display(), error = %e, "Failed to remove previous index");
        }
    }

    Ok(())
}

async fn write_files(dir: &Path, index: &VectorIndex) -> Result<()> {
    let docstore = DocStore {
        nodes: index
            .nodes()
            .iter()
            .map(|n| StoredNode {
                id: n.id,
                document_id: n.document_id.clone(),
                chunk_index: n.chunk_index,
                text: n.text.clone(),
                metadata: n.metadata.clone(),
            })
            .collect(),
    };
    let vectors = VectorStore {
        embeddings: index.nodes().iter().map(|n| (n.id, n.embedding.clone())).collect(),
    };

    fs::write(dir.join(DOCSTORE_FILE), serde_json::to_vec(&docstore)?).await?;
    fs::write(dir.join(VECTOR_STORE_FILE), serde_json::to_vec(&vectors)?).await?;
    // Manifest last: a directory without one never loads
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(index.manifest())?).await?;
    Ok(())
}

/// Read an index back from `path`
///
/// Every failure is `IndexUnreadable`; compatibility with the current
/// embedder is checked by the caller.
pub async fn read_index(path: &Path) -> Result<VectorIndex> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::index_unreadable(path, "index directory does not exist"));
    }

    let manifest: IndexManifest = read_json(path, MANIFEST_FILE).await?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(AppError::index_unreadable(
            path,
            format!(
                "unsupported format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            ),
        ));
    }

    let docstore: DocStore = read_json(path, DOCSTORE_FILE).await?;
    let mut vectors: VectorStore = read_json(path, VECTOR_STORE_FILE).await?;

    let mut nodes = Vec::with_capacity(docstore.nodes.len());
    for stored in docstore.nodes {
        let embedding = vectors.embeddings.remove(&stored.id).ok_or_else(|| {
            AppError::index_unreadable(path, format!("node {} has no embedding", stored.id))
        })?;
        if embedding.len() != manifest.dimension {
            return Err(AppError::index_unreadable(
                path,
                format!("node {} has dimension {}", stored.id, embedding.len()),
            ));
        }
        nodes.push(IndexNode {
            id: stored.id,
            document_id: stored.document_id,
            chunk_index: stored.chunk_index,
            text: stored.text,
            metadata: stored.metadata,
            embedding,
        });
    }

    let index = VectorIndex::from_parts(manifest, nodes);
    if index.node_count_matches() && index.fingerprint_matches() {
        Ok(index)
    } else {
        Err(AppError::index_unreadable(path, "manifest does not match stored nodes"))
    }
}

async fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let bytes = fs::read(dir.join(file))
        .await
        .map_err(|e| AppError::index_unreadable(dir, format!("{}: {}", file, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::index_unreadable(dir, format!("{}: {}", file, e)))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    path.with_file_name(format!(".{}.{}-{}", name, suffix, Uuid::new_v4().simple()))
}
