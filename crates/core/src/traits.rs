use crate::models::{Collection, Embedding, QueryResult, StoredRecord};
use crate::PipelineError;
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str, model: &str) -> Result<Embedding, PipelineError>;
}

/// Outcome of deleting a collection by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Collection management plus record writes and nearest-neighbour queries.
///
/// Collection calls fail with [`PipelineError::Provisioning`], writes with
/// [`PipelineError::StoreWrite`] and queries with [`PipelineError::StoreQuery`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_collection(&self, name: &str) -> Result<Collection, PipelineError>;

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Collection, PipelineError>;

    async fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, PipelineError>;

    async fn add(&self, collection_id: &str, record: &StoredRecord) -> Result<(), PipelineError>;

    async fn query(
        &self,
        collection_id: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<QueryResult, PipelineError>;
}
