use crate::error::PipelineError;
use crate::models::{Chunk, ChunkingOptions};

/// Splits `text` into windows of up to `size` words whose starts are `stride`
/// words apart. Each window is joined with single spaces.
///
/// The last window is clipped to the end of the text, and no window is
/// emitted after one that reaches the end.
pub fn chunk_words(text: &str, size: usize, stride: usize) -> Result<Vec<String>, PipelineError> {
    if size == 0 || stride == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "chunk size and stride must be positive (size={size}, stride={stride})"
        )));
    }

    let words = text.split_whitespace().collect::<Vec<_>>();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = start.saturating_add(size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = start.saturating_add(stride);
    }

    Ok(chunks)
}

/// Chunks extracted document text and tags each window with its 1-based
/// position and source filename.
pub fn build_chunks(
    text: &str,
    filename: &str,
    options: ChunkingOptions,
) -> Result<Vec<Chunk>, PipelineError> {
    let chunks = chunk_words(text, options.size, options.stride)?
        .into_iter()
        .enumerate()
        .map(|(position, text)| Chunk {
            index: position + 1,
            text,
            filename: filename.to_string(),
        })
        .collect();

    Ok(chunks)
}
