use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("pdf is encrypted: {0}")]
    Encrypted(String),
}

/// Failure talking to one of the upstream HTTP services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response from {service}: {details}")]
    Decode {
        service: &'static str,
        details: String,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read PDF: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("failed to get embedding: {0}")]
    Embedding(#[source] UpstreamError),

    #[error("failed to provision collection {collection}: {source}")]
    Provisioning {
        collection: String,
        #[source]
        source: UpstreamError,
    },

    #[error("failed to add record to collection: {0}")]
    StoreWrite(#[source] UpstreamError),

    #[error("failed to query collection: {0}")]
    StoreQuery(#[source] UpstreamError),

    #[error(
        "collection {collection} holds {expected}-dimensional embeddings but the model produced {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PipelineError {
    pub fn provisioning(collection: impl Into<String>, source: UpstreamError) -> Self {
        Self::Provisioning {
            collection: collection.into(),
            source,
        }
    }
}
