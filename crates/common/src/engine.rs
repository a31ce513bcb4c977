//! Consultation query engine
//!
//! Ties the record source, the persisted index and the answer synthesizer
//! together. One engine holds one store connection and at most one loaded
//! index; queries share the index under a read lock while builds replace it
//! under the write lock.

use crate::config::AppConfig;
use crate::context::{AnswerSynthesizer, BackendKind};
use crate::db::{RecordSource, Repository};
use crate::embeddings::create_embedder;
use crate::errors::Result;
use crate::index::{
    IndexManifest, IndexStore, RetrievedContext, Retriever, VectorIndex, VectorRetriever,
};
use crate::metrics;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, instrument};

pub struct ConsultationQueryEngine {
    source: Arc<dyn RecordSource>,
    store: IndexStore,
    synthesizer: AnswerSynthesizer,
    retriever: RwLock<Option<Arc<VectorRetriever>>>,
}

impl ConsultationQueryEngine {
    /// Build an engine over an explicit record source
    pub fn new(config: &AppConfig, source: Arc<dyn RecordSource>) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let store = IndexStore::new(&config.index, embedder);
        let synthesizer = AnswerSynthesizer::from_config(&config.llm)?;

        info!(
            backend = synthesizer.kind().as_str(),
            path = %store.persist_dir().display(),
            "Query engine configured"
        );

        Ok(Self {
            source,
            store,
            synthesizer,
            retriever: RwLock::new(None),
        })
    }

    /// Build an engine reading from the configured consultation store.
    /// The store is not contacted until records are needed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config, Arc::new(Repository::new(config.store.clone())))
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.synthesizer.kind()
    }

    pub fn persist_dir(&self) -> &Path {
        self.store.persist_dir()
    }

    /// Extract every record, rebuild the index and persist it
    #[instrument(skip(self))]
    pub async fn build_index(&self) -> Result<IndexManifest> {
        let index = self.store.rebuild_from(self.source.as_ref()).await?;
        Ok(self.install(index).await)
    }

    /// Load the persisted index, building it when missing or unreadable
    #[instrument(skip(self))]
    pub async fn load_index(&self) -> Result<IndexManifest> {
        let index = self.store.load_or_build(self.source.as_ref()).await?;
        Ok(self.install(index).await)
    }

    /// Chunks most similar to `question`; loads the index on first use
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext> {
        self.retriever().await?.retrieve(question).await
    }

    /// Answer a question from the indexed consultations
    #[instrument(skip(self), fields(backend = self.synthesizer.kind().as_str()))]
    pub async fn query(&self, question: &str) -> Result<String> {
        let start = Instant::now();

        let context = self.retrieve(question).await?;
        let answer = self.synthesizer.answer(&context, question).await?;

        let elapsed = start.elapsed();
        metrics::record_query(
            elapsed.as_secs_f64(),
            self.synthesizer.kind().as_str(),
            context.len(),
        );
        info!(
            chunks = context.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Question answered"
        );

        Ok(answer)
    }

    /// Check that the record source is reachable
    pub async fn ping(&self) -> Result<()> {
        self.source.ping().await
    }

    async fn retriever(&self) -> Result<Arc<VectorRetriever>> {
        if let Some(retriever) = self.retriever.read().await.as_ref() {
            return Ok(retriever.clone());
        }

        let mut slot = self.retriever.write().await;
        if let Some(retriever) = slot.as_ref() {
            return Ok(retriever.clone());
        }

        let index = self.store.load_or_build(self.source.as_ref()).await?;
        let retriever = Arc::new(self.store.as_queryable(index));
        *slot = Some(retriever.clone());
        Ok(retriever)
    }

    async fn install(&self, index: VectorIndex) -> IndexManifest {
        let manifest = index.manifest().clone();
        *self.retriever.write().await = Some(Arc::new(self.store.as_queryable(index)));
        manifest
    }
}
