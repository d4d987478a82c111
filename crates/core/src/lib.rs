pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod provisioner;
pub mod search;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod testing;

pub use chunking::{build_chunks, chunk_words};
pub use embeddings::{OllamaEmbedder, DEFAULT_OLLAMA_URL};
pub use error::{ExtractionError, PipelineError, UpstreamError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, IngestionPipeline};
pub use models::{
    Chunk, ChunkFailure, ChunkMetadata, ChunkingOptions, Collection, Embedding, FailureStage,
    IngestionSummary, PipelineSettings, QueryResult, SearchHit, StoredRecord,
    DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_STRIDE, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_TOP_K,
};
pub use orchestrator::DocumentService;
pub use provisioner::{ensure_dimension, CollectionProvisioner};
pub use search::SearchPipeline;
pub use stores::{ChromaStore, DEFAULT_CHROMA_URL};
pub use traits::{DeleteOutcome, Embedder, VectorStore};
