use crate::models::{PipelineSettings, QueryResult};
use crate::provisioner::{ensure_dimension, CollectionProvisioner};
use crate::traits::{Embedder, VectorStore};
use crate::PipelineError;
use std::sync::Arc;
use tracing::info;

/// Embeds a query once and asks the store for its nearest chunks.
/// Failures propagate: a failed search has no useful partial result.
pub struct SearchPipeline<E: ?Sized, S: ?Sized> {
    embedder: Arc<E>,
    store: Arc<S>,
    settings: PipelineSettings,
}

impl<E, S> SearchPipeline<E, S>
where
    E: Embedder + ?Sized,
    S: VectorStore + ?Sized,
{
    pub fn new(embedder: Arc<E>, store: Arc<S>, settings: PipelineSettings) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    pub async fn search(&self, query: &str) -> Result<QueryResult, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::InvalidArgument("query is empty".to_string()));
        }

        info!(query, collection = %self.settings.collection, "searching");

        let embedding = self
            .embedder
            .embed(query, &self.settings.embedding_model)
            .await?;

        let provisioner = CollectionProvisioner::new(&*self.store, &self.settings.embedding_model);
        let collection = provisioner.resolve(&self.settings.collection).await?;
        ensure_dimension(&collection, &embedding)?;

        let result = self
            .store
            .query(&collection.id, &embedding, self.settings.top_k)
            .await?;

        info!(
            query,
            hits = result.ids.first().map(Vec::len).unwrap_or_default(),
            "search finished"
        );
        Ok(result)
    }
}
