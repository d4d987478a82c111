pub mod chroma;

pub use chroma::{ChromaStore, DEFAULT_CHROMA_URL};
