use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_CHUNK_STRIDE: usize = 80;
pub const DEFAULT_EMBEDDING_MODEL: &str = "embeddinggemma:300m";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_TOP_K: usize = 5;

/// Metadata key recording which model populated a collection.
pub const EMBEDDING_MODEL_KEY: &str = "embedding_model";

pub type Embedding = Vec<f32>;

/// A word window cut from an extracted document. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub filename: String,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    pub size: usize,
    pub stride: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            stride: DEFAULT_CHUNK_STRIDE,
        }
    }
}

impl ChunkingOptions {
    /// Applies caller overrides on top of the defaults. Anything that is not a
    /// positive integer is ignored.
    pub fn with_overrides(size: Option<i64>, stride: Option<i64>) -> Self {
        let defaults = Self::default();
        Self {
            size: positive(size).unwrap_or(defaults.size),
            stride: positive(stride).unwrap_or(defaults.stride),
        }
    }
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|value| *value > 0)
        .and_then(|value| usize::try_from(value).ok())
}

/// Values the pipelines need from process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub embedding_model: String,
    pub collection: String,
    pub top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A collection as reported by the vector store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl Collection {
    pub fn embedding_model(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(EMBEDDING_MODEL_KEY))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub filename: String,
    pub chunk_num: usize,
}

/// One chunk as persisted in the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub embedding: Embedding,
    pub metadata: ChunkMetadata,
}

impl StoredRecord {
    /// Every record gets a fresh id, so re-uploading a file adds new records.
    pub fn from_chunk(chunk: &Chunk, embedding: Embedding) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document: chunk.text.clone(),
            embedding,
            metadata: ChunkMetadata {
                source: "pdf".to_string(),
                filename: chunk.filename.clone(),
                chunk_num: chunk.index,
            },
        }
    }
}

/// Nearest-neighbour results, one outer element per query embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub rank: usize,
    pub id: String,
    pub document: Option<String>,
    pub metadata: Option<Value>,
    pub distance: Option<f32>,
}

impl SearchHit {
    pub fn filename(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("filename"))
            .and_then(Value::as_str)
    }

    pub fn chunk_num(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("chunk_num"))
            .and_then(Value::as_u64)
    }
}

impl QueryResult {
    /// Flattens the results of the first query embedding in store order.
    pub fn hits(&self) -> Vec<SearchHit> {
        let Some(ids) = self.ids.first() else {
            return Vec::new();
        };

        let documents = self.documents.as_ref().and_then(|outer| outer.first());
        let metadatas = self.metadatas.as_ref().and_then(|outer| outer.first());
        let distances = self.distances.as_ref().and_then(|outer| outer.first());

        ids.iter()
            .enumerate()
            .map(|(position, id)| SearchHit {
                rank: position + 1,
                id: id.clone(),
                document: documents.and_then(|row| row.get(position).cloned().flatten()),
                metadata: metadatas.and_then(|row| row.get(position).cloned().flatten()),
                distance: distances.and_then(|row| row.get(position).copied().flatten()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Embedding,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk: usize,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub status: String,
    pub filename: String,
    pub chunk_size: usize,
    pub chunk_stride: usize,
    pub chunks_total: usize,
    pub chunks_stored: usize,
    pub failures: Vec<ChunkFailure>,
}

impl IngestionSummary {
    pub fn chunks_failed(&self) -> usize {
        self.failures.len()
    }
}
