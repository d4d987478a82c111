use crate::extractor::PdfExtractor;
use crate::ingest::IngestionPipeline;
use crate::models::{ChunkingOptions, IngestionSummary, PipelineSettings, QueryResult};
use crate::provisioner::CollectionProvisioner;
use crate::search::SearchPipeline;
use crate::traits::{DeleteOutcome, Embedder, VectorStore};
use crate::PipelineError;
use std::path::Path;
use std::sync::Arc;

/// The upload, search and reset operations over one configured collection,
/// sharing a single embedder and store client.
pub struct DocumentService<X, E: ?Sized, S: ?Sized> {
    ingestion: IngestionPipeline<X, E, S>,
    search: SearchPipeline<E, S>,
    store: Arc<S>,
    settings: PipelineSettings,
}

impl<X, E, S> DocumentService<X, E, S>
where
    X: PdfExtractor + Send + Sync + 'static,
    E: Embedder + ?Sized,
    S: VectorStore + ?Sized,
{
    pub fn new(extractor: X, embedder: Arc<E>, store: Arc<S>, settings: PipelineSettings) -> Self {
        Self {
            ingestion: IngestionPipeline::new(
                Arc::new(extractor),
                Arc::clone(&embedder),
                Arc::clone(&store),
                settings.clone(),
            ),
            search: SearchPipeline::new(embedder, Arc::clone(&store), settings.clone()),
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn ingest(
        &self,
        path: &Path,
        filename: &str,
        options: ChunkingOptions,
    ) -> Result<IngestionSummary, PipelineError> {
        self.ingestion.ingest(path, filename, options).await
    }

    pub async fn search(&self, query: &str) -> Result<QueryResult, PipelineError> {
        self.search.search(query).await
    }

    /// Drops the configured collection.
    pub async fn reset(&self) -> Result<DeleteOutcome, PipelineError> {
        self.reset_collection(&self.settings.collection).await
    }

    pub async fn reset_collection(&self, name: &str) -> Result<DeleteOutcome, PipelineError> {
        CollectionProvisioner::new(&*self.store, &self.settings.embedding_model)
            .reset(name)
            .await
    }
}
