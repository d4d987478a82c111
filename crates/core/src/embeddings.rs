use crate::error::UpstreamError;
use crate::models::Embedding;
use crate::traits::Embedder;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const SERVICE: &str = "ollama";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for the Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    endpoint: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    /// `timeout` bounds each embedding call; `None` leaves the client default.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| PipelineError::Embedding(UpstreamError::Http(error)))?;
        Ok(Self::with_client(endpoint, client))
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn request(&self, text: &str, model: &str) -> Result<Embedding, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&EmbeddingRequest {
                model,
                prompt: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|error| UpstreamError::Decode {
                service: SERVICE,
                details: error.to_string(),
            })?;

        if parsed.embedding.is_empty() {
            return Err(UpstreamError::Decode {
                service: SERVICE,
                details: format!("empty embedding for model {model}"),
            });
        }

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str, model: &str) -> Result<Embedding, PipelineError> {
        self.request(text, model)
            .await
            .map_err(PipelineError::Embedding)
    }
}
