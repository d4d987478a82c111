//! In-memory stand-ins for the embedding provider and the vector store.

use crate::error::UpstreamError;
use crate::models::{Collection, Embedding, QueryResult, StoredRecord};
use crate::traits::{DeleteOutcome, Embedder, VectorStore};
use crate::PipelineError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

fn status(service: &'static str, status: u16, body: &str) -> UpstreamError {
    UpstreamError::Status {
        service,
        status,
        body: body.to_string(),
    }
}

#[derive(Default)]
enum LookupFailure {
    #[default]
    None,
    Status(u16),
    Decode,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Collection>,
    records: Vec<(String, StoredRecord)>,
    next_id: usize,
    get_calls: usize,
    create_calls: usize,
    lookup_failure: LookupFailure,
    create_rejection: Option<(u16, String)>,
    empty_ids: bool,
    delete_failure: Option<(u16, String)>,
    failing_chunks: Vec<usize>,
    query_failure: Option<(u16, String)>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    fn with_state<T>(&self, apply: impl FnOnce(&mut StoreState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        apply(&mut state)
    }

    pub fn fail_lookups_with_status(&self, code: u16) {
        self.with_state(|state| state.lookup_failure = LookupFailure::Status(code));
    }

    pub fn fail_lookups_with_decode_error(&self) {
        self.with_state(|state| state.lookup_failure = LookupFailure::Decode);
    }

    pub fn reject_creates(&self, code: u16, body: &str) {
        self.with_state(|state| state.create_rejection = Some((code, body.to_string())));
    }

    pub fn create_with_empty_ids(&self) {
        self.with_state(|state| state.empty_ids = true);
    }

    pub fn fail_deletes(&self, code: u16, body: &str) {
        self.with_state(|state| state.delete_failure = Some((code, body.to_string())));
    }

    /// Writes of the given 1-based chunk numbers are rejected.
    pub fn fail_writes_for_chunks(&self, chunks: &[usize]) {
        self.with_state(|state| state.failing_chunks = chunks.to_vec());
    }

    pub fn fail_queries(&self, code: u16, body: &str) {
        self.with_state(|state| state.query_failure = Some((code, body.to_string())));
    }

    pub fn insert_collection(&self, collection: Collection) {
        self.with_state(|state| {
            state
                .collections
                .insert(collection.name.clone(), collection)
        });
    }

    pub fn get_calls(&self) -> usize {
        self.with_state(|state| state.get_calls)
    }

    pub fn create_calls(&self) -> usize {
        self.with_state(|state| state.create_calls)
    }

    pub fn records(&self) -> Vec<(String, StoredRecord)> {
        self.with_state(|state| state.records.clone())
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn get_collection(&self, name: &str) -> Result<Collection, PipelineError> {
        self.with_state(|state| {
            state.get_calls += 1;
            match state.lookup_failure {
                LookupFailure::Status(code) => {
                    return Err(PipelineError::provisioning(
                        name,
                        status("chroma", code, "unavailable"),
                    ))
                }
                LookupFailure::Decode => {
                    return Err(PipelineError::provisioning(
                        name,
                        UpstreamError::Decode {
                            service: "chroma",
                            details: "expected value".to_string(),
                        },
                    ))
                }
                LookupFailure::None => {}
            }
            state.collections.get(name).cloned().ok_or_else(|| {
                PipelineError::provisioning(name, status("chroma", 404, "collection not found"))
            })
        })
    }

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Collection, PipelineError> {
        self.with_state(|state| {
            state.create_calls += 1;
            if let Some((code, body)) = &state.create_rejection {
                return Err(PipelineError::provisioning(name, status("chroma", *code, body)));
            }
            if state.empty_ids {
                return Ok(Collection::default());
            }
            state.next_id += 1;
            let collection = Collection {
                id: format!("col-{}", state.next_id),
                name: name.to_string(),
                dimension: None,
                metadata,
            };
            state
                .collections
                .insert(name.to_string(), collection.clone());
            Ok(collection)
        })
    }

    async fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, PipelineError> {
        self.with_state(|state| {
            if let Some((code, body)) = &state.delete_failure {
                return Err(PipelineError::provisioning(name, status("chroma", *code, body)));
            }
            match state.collections.remove(name) {
                Some(removed) => {
                    state.records.retain(|(id, _)| *id != removed.id);
                    Ok(DeleteOutcome::Deleted)
                }
                None => Ok(DeleteOutcome::NotFound),
            }
        })
    }

    async fn add(&self, collection_id: &str, record: &StoredRecord) -> Result<(), PipelineError> {
        self.with_state(|state| {
            if state.failing_chunks.contains(&record.metadata.chunk_num) {
                return Err(PipelineError::StoreWrite(status("chroma", 500, "write rejected")));
            }
            if let Some(collection) = state
                .collections
                .values_mut()
                .find(|collection| collection.id == collection_id)
            {
                collection.dimension.get_or_insert(record.embedding.len());
            }
            state
                .records
                .push((collection_id.to_string(), record.clone()));
            Ok(())
        })
    }

    async fn query(
        &self,
        collection_id: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<QueryResult, PipelineError> {
        self.with_state(|state| {
            if let Some((code, body)) = &state.query_failure {
                return Err(PipelineError::StoreQuery(status("chroma", *code, body)));
            }

            let mut scored = state
                .records
                .iter()
                .filter(|(id, _)| id == collection_id)
                .map(|(_, record)| {
                    let distance = record
                        .embedding
                        .iter()
                        .zip(embedding)
                        .map(|(left, right)| (left - right) * (left - right))
                        .sum::<f32>();
                    (distance, record)
                })
                .collect::<Vec<_>>();
            scored.sort_by(|left, right| left.0.total_cmp(&right.0));
            scored.truncate(top_k);

            Ok(QueryResult {
                ids: vec![scored.iter().map(|(_, record)| record.id.clone()).collect()],
                documents: Some(vec![scored
                    .iter()
                    .map(|(_, record)| Some(record.document.clone()))
                    .collect()]),
                metadatas: Some(vec![scored
                    .iter()
                    .map(|(_, record)| serde_json::to_value(&record.metadata).ok())
                    .collect()]),
                distances: Some(vec![scored
                    .iter()
                    .map(|(distance, _)| Some(*distance))
                    .collect()]),
            })
        })
    }
}

/// Returns `[word_count, 1.0, 0.0, ...]` of a fixed width, failing for texts
/// that contain any configured marker.
pub struct FakeEmbedder {
    dimensions: usize,
    failing_markers: Vec<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            failing_markers: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.failing_markers.push(marker.to_string());
        self
    }

    /// `(text, model)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str, model: &str) -> Result<Embedding, PipelineError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), model.to_string()));

        if self
            .failing_markers
            .iter()
            .any(|marker| text.contains(marker.as_str()))
        {
            return Err(PipelineError::Embedding(status("ollama", 500, "model crashed")));
        }

        let mut vector = vec![0.0; self.dimensions.max(2)];
        vector[0] = text.split_whitespace().count() as f32;
        vector[1] = 1.0;
        Ok(vector)
    }
}
