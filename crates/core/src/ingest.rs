use crate::chunking::build_chunks;
use crate::error::ExtractionError;
use crate::extractor::PdfExtractor;
use crate::models::{
    ChunkFailure, ChunkingOptions, FailureStage, IngestionSummary, PipelineSettings, StoredRecord,
};
use crate::provisioner::{ensure_dimension, CollectionProvisioner};
use crate::traits::{Embedder, VectorStore};
use crate::PipelineError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Every `.pdf` file (any case) below `folder`, in path order. Entries that
/// cannot be read are logged and skipped.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| {
            entry
                .map_err(|error| warn!(folder = %folder.display(), %error, "skipping unreadable entry"))
                .ok()
        })
        .filter(|entry| entry.file_type().is_file() && has_pdf_extension(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}

/// Extract, chunk, embed and store one uploaded PDF.
///
/// Chunks are processed one after another. A chunk whose embedding or write
/// fails is recorded in the summary and skipped; only a document that cannot
/// be read, a collection that cannot be provisioned, or an embedding width
/// that contradicts the collection fails the whole call.
pub struct IngestionPipeline<X, E: ?Sized, S: ?Sized> {
    extractor: Arc<X>,
    embedder: Arc<E>,
    store: Arc<S>,
    settings: PipelineSettings,
}

impl<X, E, S> IngestionPipeline<X, E, S>
where
    X: PdfExtractor + Send + Sync + 'static,
    E: Embedder + ?Sized,
    S: VectorStore + ?Sized,
{
    pub fn new(extractor: Arc<X>, embedder: Arc<E>, store: Arc<S>, settings: PipelineSettings) -> Self {
        Self {
            extractor,
            embedder,
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
        let text = self.extract(path).await?;
        info!(
            filename,
            characters = text.chars().count(),
            "extracted text from pdf"
        );

        let chunks = build_chunks(&text, filename, options)?;
        info!(
            filename,
            chunks = chunks.len(),
            chunk_size = options.size,
            chunk_stride = options.stride,
            "split pdf into chunks"
        );

        let mut summary = IngestionSummary {
            status: "completed".to_string(),
            filename: filename.to_string(),
            chunk_size: options.size,
            chunk_stride: options.stride,
            chunks_total: chunks.len(),
            chunks_stored: 0,
            failures: Vec::new(),
        };

        if chunks.is_empty() {
            warn!(filename, "pdf contained no words, nothing to store");
            return Ok(summary);
        }

        let provisioner = CollectionProvisioner::new(&*self.store, &self.settings.embedding_model);
        let mut collection = provisioner.resolve(&self.settings.collection).await?;
        let total = chunks.len();

        for chunk in &chunks {
            debug!(chunk = chunk.index, total, words = chunk.word_count(), "processing chunk");

            let embedding = match self
                .embedder
                .embed(&chunk.text, &self.settings.embedding_model)
                .await
            {
                Ok(embedding) => embedding,
                Err(error) => {
                    warn!(chunk = chunk.index, stage = "embedding", error = %error, "dropping chunk");
                    summary.failures.push(ChunkFailure {
                        chunk: chunk.index,
                        stage: FailureStage::Embedding,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            ensure_dimension(&collection, &embedding)?;

            let width = embedding.len();
            let record = StoredRecord::from_chunk(chunk, embedding);
            match self.store.add(&collection.id, &record).await {
                Ok(()) => {
                    collection.dimension.get_or_insert(width);
                    summary.chunks_stored += 1;
                    debug!(chunk = chunk.index, total, id = %record.id, "stored chunk");
                }
                Err(error) => {
                    warn!(chunk = chunk.index, stage = "store", error = %error, "dropping chunk");
                    summary.failures.push(ChunkFailure {
                        chunk: chunk.index,
                        stage: FailureStage::Store,
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(
            filename,
            stored = summary.chunks_stored,
            failed = summary.chunks_failed(),
            total,
            "finished processing chunks"
        );
        Ok(summary)
    }

    async fn extract(&self, path: &Path) -> Result<String, PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&path))
            .await
            .map_err(|error| ExtractionError::PdfParse(format!("extraction task failed: {error}")))??;
        Ok(text)
    }
}
