use clap::Args;
use pdf_vector_core::{
    ChromaStore, DocumentService, LopdfExtractor, OllamaEmbedder, PipelineSettings,
    DEFAULT_CHROMA_URL, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_TOP_K,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub type Service = DocumentService<LopdfExtractor, OllamaEmbedder, ChromaStore>;

/// Upstream endpoints and pipeline defaults shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ServiceConfig {
    /// Ollama base URL
    #[arg(long, global = true, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Chroma base URL
    #[arg(long, global = true, env = "CHROMA_URL", default_value = DEFAULT_CHROMA_URL)]
    pub chroma_url: String,

    /// Embedding model passed to Ollama
    #[arg(long, global = true, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Chroma collection holding the chunks
    #[arg(long, global = true, env = "COLLECTION_NAME", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Per-request timeout for upstream calls in seconds, 0 disables it.
    #[arg(long, global = true, env = "HTTP_TIMEOUT_SECS", default_value_t = 120)]
    pub http_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            embedding_model: self.embedding_model.clone(),
            collection: self.collection.clone(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    pub fn build_service(&self) -> anyhow::Result<Service> {
        let embedder = OllamaEmbedder::with_timeout(&self.ollama_url, self.timeout())?;
        let store = ChromaStore::with_timeout(&self.chroma_url, self.timeout())?;
        Ok(DocumentService::new(
            LopdfExtractor,
            Arc::new(embedder),
            Arc::new(store),
            self.settings(),
        ))
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory with the built frontend
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend/dist")]
    pub frontend_dir: PathBuf,

    /// Username accepted by /api/login
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Password accepted by /api/login
    #[arg(long, env = "ADMIN_PASSWORD", default_value = "secret", hide_env_values = true)]
    pub admin_password: String,

    /// HMAC secret for signing session tokens
    #[arg(long, env = "JWT_SECRET", default_value = "change_me_in_prod", hide_env_values = true)]
    pub jwt_secret: String,

    /// Largest accepted upload in MiB, 0 removes the limit
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 512)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn upload_limit(&self) -> Option<usize> {
        (self.max_upload_mb > 0).then(|| self.max_upload_mb.saturating_mul(1 << 20))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        service: ServiceConfig,
    }

    #[test]
    fn flags_map_into_pipeline_settings() {
        let harness = Harness::parse_from([
            "test",
            "--embedding-model",
            "nomic-embed-text",
            "--collection",
            "manuals",
            "--http-timeout-secs",
            "0",
        ]);

        let settings = harness.service.settings();
        assert_eq!(settings.embedding_model, "nomic-embed-text");
        assert_eq!(settings.collection, "manuals");
        assert_eq!(settings.top_k, 5);
        assert_eq!(harness.service.timeout(), None);
    }

    #[derive(Parser)]
    struct ServerHarness {
        #[command(flatten)]
        server: ServerConfig,
    }

    #[test]
    fn upload_limit_is_in_mebibytes_and_zero_disables_it() {
        let harness = ServerHarness::parse_from(["test", "--max-upload-mb", "64"]);
        assert_eq!(harness.server.upload_limit(), Some(64 << 20));

        let harness = ServerHarness::parse_from(["test", "--max-upload-mb", "0"]);
        assert_eq!(harness.server.upload_limit(), None);
    }

    #[test]
    fn timeout_is_in_seconds() {
        let harness = Harness::parse_from(["test", "--http-timeout-secs", "30"]);
        assert_eq!(harness.service.timeout(), Some(Duration::from_secs(30)));
    }
}
