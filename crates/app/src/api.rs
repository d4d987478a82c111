//! HTTP surface.
//!
//! - `POST /api/login` – exchange the admin credentials for a session token.
//! - `POST /api/upload` – multipart PDF upload (`file`, optional `chunkSize`, `chunkStride`);
//!   extracts, chunks, embeds and stores the document and returns a per-chunk summary.
//! - `GET /api/search?q=` – nearest chunks for a free-text query.
//! - `GET|POST /api/reset` – drop the configured collection.
//! - `GET /api/health` – liveness check.
//!
//! Upload, search and reset require `Authorization: Bearer <token>`. Any other path is served
//! from the frontend directory.

use crate::auth::{AuthError, JwtAuth};
use async_trait::async_trait;
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Query, Request, State,
    },
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdf_vector_core::{
    ChunkingOptions, DeleteOutcome, DocumentService, Embedder, IngestionSummary, PdfExtractor,
    PipelineError, QueryResult, VectorStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};

/// Request body cap applied to the protected routes unless configured otherwise.
pub const DEFAULT_UPLOAD_LIMIT: usize = 512 << 20;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Served for every path the API does not claim.
    pub frontend_dir: Option<PathBuf>,
    /// Largest accepted request body in bytes; `None` accepts any size.
    pub upload_limit: Option<usize>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            frontend_dir: None,
            upload_limit: Some(DEFAULT_UPLOAD_LIMIT),
        }
    }
}

/// Operations the HTTP layer needs from the document pipeline.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn ingest(
        &self,
        path: &Path,
        filename: &str,
        options: ChunkingOptions,
    ) -> Result<IngestionSummary, PipelineError>;

    async fn search(&self, query: &str) -> Result<QueryResult, PipelineError>;

    async fn reset(&self) -> Result<DeleteOutcome, PipelineError>;

    fn collection(&self) -> &str;
}

#[async_trait]
impl<X, E, S> DocumentApi for DocumentService<X, E, S>
where
    X: PdfExtractor + Send + Sync + 'static,
    E: Embedder + ?Sized + 'static,
    S: VectorStore + ?Sized + 'static,
{
    async fn ingest(
        &self,
        path: &Path,
        filename: &str,
        options: ChunkingOptions,
    ) -> Result<IngestionSummary, PipelineError> {
        DocumentService::ingest(self, path, filename, options).await
    }

    async fn search(&self, query: &str) -> Result<QueryResult, PipelineError> {
        DocumentService::search(self, query).await
    }

    async fn reset(&self) -> Result<DeleteOutcome, PipelineError> {
        DocumentService::reset(self).await
    }

    fn collection(&self) -> &str {
        &self.settings().collection
    }
}

pub fn create_router<D>(service: Arc<D>, auth: Arc<JwtAuth>, options: RouterOptions) -> Router
where
    D: DocumentApi + 'static,
{
    let body_limit = match options.upload_limit {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let protected = Router::new()
        .route("/api/upload", post(upload::<D>))
        .route("/api/search", get(search::<D>))
        .route("/api/reset", get(reset::<D>).post(reset::<D>))
        .route_layer(middleware::from_fn_with_state(auth.clone(), require_bearer))
        .layer(body_limit)
        .with_state(service);

    let public = Router::new()
        .route("/api/login", post(login))
        .route("/api/health", get(health))
        .with_state(auth);

    let router = public.merge(protected);
    let router = match options.frontend_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.layer(CorsLayer::permissive())
}

async fn require_bearer(
    State(auth): State<Arc<JwtAuth>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    auth.verify_header(header)?;
    Ok(next.run(request).await)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

async fn login(
    State(auth): State<Arc<JwtAuth>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) = payload.map_err(|_| AppError::BadRequest("Invalid request".into()))?;
    let token = auth.login(&request.username, &request.password)?;
    info!(username = %request.username, "issued session token");
    Ok(Json(LoginResponse { token }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Accept a multipart PDF, stream it into a temporary file and run ingestion on it.
async fn upload<D>(
    State(service): State<Arc<D>>,
    mut multipart: Multipart,
) -> Result<Json<IngestionSummary>, AppError>
where
    D: DocumentApi,
{
    let mut file = None;
    let mut chunk_size = None;
    let mut chunk_stride = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| multipart_error("failed to parse form", error))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let (temp, size) = spool_to_temp(field).await?;
                info!(filename = %filename, size, "received file");
                file = Some((filename, temp));
            }
            "chunkSize" => chunk_size = parse_override(field.text().await.ok()),
            "chunkStride" => chunk_stride = parse_override(field.text().await.ok()),
            _ => {}
        }
    }

    let (filename, temp) =
        file.ok_or_else(|| AppError::BadRequest("failed to get file: missing 'file' field".into()))?;

    let options = ChunkingOptions::with_overrides(chunk_size, chunk_stride);
    info!(
        chunk_size = options.size,
        chunk_stride = options.stride,
        "processing upload"
    );

    let summary = service.ingest(temp.path(), &filename, options).await?;
    if summary.failures.is_empty() {
        info!(filename = %filename, chunks = summary.chunks_stored, "processed upload");
    } else {
        warn!(
            filename = %filename,
            stored = summary.chunks_stored,
            failed = summary.failures.len(),
            "processed upload with dropped chunks"
        );
    }
    Ok(Json(summary))
}

/// Writes a multipart field to a fresh `upload-*.pdf` file chunk by chunk.
/// The file is removed when the returned handle drops.
async fn spool_to_temp(mut field: Field<'_>) -> Result<(NamedTempFile, u64), AppError> {
    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|error| AppError::Internal(format!("failed to create temp file: {error}")))?;
    let mut out = tokio::fs::File::create(temp.path())
        .await
        .map_err(|error| AppError::Internal(format!("failed to save file: {error}")))?;

    let mut size = 0u64;
    while let Some(bytes) = field
        .chunk()
        .await
        .map_err(|error| multipart_error("failed to get file", error))?
    {
        out.write_all(&bytes)
            .await
            .map_err(|error| AppError::Internal(format!("failed to save file: {error}")))?;
        size += bytes.len() as u64;
    }
    out.flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to save file: {error}")))?;

    Ok((temp, size))
}

fn multipart_error(context: &str, error: MultipartError) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: upload exceeds the size limit"))
    } else {
        AppError::BadRequest(format!("{context}: {error}"))
    }
}

fn parse_override(raw: Option<String>) -> Option<i64> {
    raw.and_then(|value| value.parse().ok())
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

async fn search<D>(
    State(service): State<Arc<D>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<QueryResult>, AppError>
where
    D: DocumentApi,
{
    let query = params
        .q
        .filter(|query| !query.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing query parameter 'q'".into()))?;
    Ok(Json(service.search(&query).await?))
}

async fn reset<D>(State(service): State<Arc<D>>) -> Result<Json<Value>, AppError>
where
    D: DocumentApi,
{
    info!(collection = service.collection(), "resetting collection");
    service.reset().await?;
    Ok(Json(json!({
        "status": "reset successful",
        "collection": service.collection(),
    })))
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) | Self::Pipeline(PipelineError::InvalidArgument(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(AuthError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Pipeline(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
