use crate::error::UpstreamError;
use crate::models::{Collection, EMBEDDING_MODEL_KEY};
use crate::traits::{DeleteOutcome, VectorStore};
use crate::PipelineError;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Resolves collection names to store identifiers, creating collections on
/// first use. Nothing is cached: every call goes to the store.
pub struct CollectionProvisioner<'a, S: ?Sized> {
    store: &'a S,
    embedding_model: &'a str,
}

impl<'a, S> CollectionProvisioner<'a, S>
where
    S: VectorStore + ?Sized,
{
    pub fn new(store: &'a S, embedding_model: &'a str) -> Self {
        Self {
            store,
            embedding_model,
        }
    }

    /// Get-or-create. A lookup that fails at the transport level or with a
    /// non-success status falls through to creation; a lookup that succeeds
    /// with an unreadable body does not.
    pub async fn resolve(&self, name: &str) -> Result<Collection, PipelineError> {
        match self.store.get_collection(name).await {
            Ok(collection) => {
                let collection = require_id(name, collection)?;
                debug!(collection = name, id = %collection.id, "resolved existing collection");
                self.check_model(&collection);
                return Ok(collection);
            }
            Err(PipelineError::Provisioning {
                source: source @ UpstreamError::Decode { .. },
                ..
            }) => return Err(PipelineError::provisioning(name, source)),
            Err(error) => {
                debug!(collection = name, error = %error, "collection lookup failed, creating it");
            }
        }

        let mut metadata = Map::new();
        metadata.insert(
            EMBEDDING_MODEL_KEY.to_string(),
            Value::String(self.embedding_model.to_string()),
        );

        let created = self.store.create_collection(name, Some(metadata)).await?;
        let created = require_id(name, created)?;
        info!(collection = name, id = %created.id, "created collection");
        Ok(created)
    }

    /// Deletes the named collection. A collection that does not exist counts
    /// as deleted.
    pub async fn reset(&self, name: &str) -> Result<DeleteOutcome, PipelineError> {
        let outcome = self.store.delete_collection(name).await?;
        match outcome {
            DeleteOutcome::Deleted => info!(collection = name, "collection reset"),
            DeleteOutcome::NotFound => info!(collection = name, "collection already absent"),
        }
        Ok(outcome)
    }

    fn check_model(&self, collection: &Collection) {
        if let Some(recorded) = collection.embedding_model() {
            if recorded != self.embedding_model {
                warn!(
                    collection = %collection.name,
                    recorded_model = recorded,
                    configured_model = self.embedding_model,
                    "collection was populated by a different embedding model"
                );
            }
        }
    }
}

fn require_id(name: &str, collection: Collection) -> Result<Collection, PipelineError> {
    if collection.id.is_empty() {
        return Err(PipelineError::provisioning(
            name,
            UpstreamError::Decode {
                service: "chroma",
                details: "received empty collection id".to_string(),
            },
        ));
    }
    Ok(collection)
}

/// Rejects an embedding whose width differs from what the collection
/// already holds.
pub fn ensure_dimension(collection: &Collection, embedding: &[f32]) -> Result<(), PipelineError> {
    match collection.dimension {
        Some(expected) if expected != embedding.len() => Err(PipelineError::DimensionMismatch {
            collection: collection.name.clone(),
            expected,
            actual: embedding.len(),
        }),
        _ => Ok(()),
    }
}
