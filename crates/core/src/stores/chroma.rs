use crate::error::UpstreamError;
use crate::models::{ChunkMetadata, Collection, QueryResult, StoredRecord};
use crate::traits::{DeleteOutcome, VectorStore};
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8000";

const SERVICE: &str = "chroma";
const COLLECTIONS_PATH: [&str; 7] = [
    "api",
    "v2",
    "tenants",
    "default_tenant",
    "databases",
    "default_database",
    "collections",
];

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    documents: [&'a str; 1],
    metadatas: [&'a ChunkMetadata; 1],
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
}

/// HTTP client for the Chroma v2 collections API in the default tenant and
/// database.
pub struct ChromaStore {
    base: Url,
    client: Client,
}

impl ChromaStore {
    pub fn new(endpoint: &str) -> Result<Self, PipelineError> {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> Result<Self, PipelineError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| PipelineError::InvalidArgument(format!("http client: {error}")))?;
        Self::with_client(endpoint, client)
    }

    pub fn with_client(endpoint: &str, client: Client) -> Result<Self, PipelineError> {
        let base = Url::parse(endpoint).map_err(|error| {
            PipelineError::InvalidArgument(format!("invalid chroma url {endpoint}: {error}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(PipelineError::InvalidArgument(format!(
                "chroma url cannot carry a path: {endpoint}"
            )));
        }
        Ok(Self { base, client })
    }

    fn collections_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(COLLECTIONS_PATH).extend(segments);
        }
        url
    }

    async fn fetch_collection(&self, name: &str) -> Result<Collection, UpstreamError> {
        let response = self
            .client
            .get(self.collections_url(&[name]))
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    async fn post_collection(
        &self,
        name: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Collection, UpstreamError> {
        let response = self
            .client
            .post(self.collections_url(&[]))
            .json(&CreateCollectionRequest { name, metadata })
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    async fn remove_collection(&self, name: &str) -> Result<DeleteOutcome, UpstreamError> {
        let response = self
            .client
            .delete(self.collections_url(&[name]))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        ensure_success(response).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn post_record(&self, collection_id: &str, record: &StoredRecord) -> Result<(), UpstreamError> {
        let payload = AddRequest {
            documents: [record.document.as_str()],
            metadatas: [&record.metadata],
            ids: [record.id.as_str()],
            embeddings: [record.embedding.as_slice()],
        };
        let response = self
            .client
            .post(self.collections_url(&[collection_id, "add"]))
            .json(&payload)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn post_query(
        &self,
        collection_id: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<QueryResult, UpstreamError> {
        let response = self
            .client
            .post(self.collections_url(&[collection_id, "query"]))
            .json(&QueryRequest {
                query_embeddings: [embedding],
                n_results: top_k,
            })
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        service: SERVICE,
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|error| UpstreamError::Decode {
        service: SERVICE,
        details: error.to_string(),
    })
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn get_collection(&self, name: &str) -> Result<Collection, PipelineError> {
        self.fetch_collection(name)
            .await
            .map_err(|source| PipelineError::provisioning(name, source))
    }

    async fn create_collection(
        &self,
        name: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Collection, PipelineError> {
        self.post_collection(name, metadata)
            .await
            .map_err(|source| PipelineError::provisioning(name, source))
    }

    async fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, PipelineError> {
        self.remove_collection(name)
            .await
            .map_err(|source| PipelineError::provisioning(name, source))
    }

    async fn add(&self, collection_id: &str, record: &StoredRecord) -> Result<(), PipelineError> {
        self.post_record(collection_id, record)
            .await
            .map_err(PipelineError::StoreWrite)
    }

    async fn query(
        &self,
        collection_id: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<QueryResult, PipelineError> {
        self.post_query(collection_id, embedding, top_k)
            .await
            .map_err(PipelineError::StoreQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::ChromaStore;
    use crate::error::UpstreamError;
    use crate::models::{ChunkMetadata, StoredRecord};
    use crate::traits::{DeleteOutcome, VectorStore};
    use crate::PipelineError;
    use httpmock::{
        Method::{DELETE, GET, POST},
        MockServer,
    };
    use serde_json::json;

    const BASE: &str = "/api/v2/tenants/default_tenant/databases/default_database/collections";

    fn record() -> StoredRecord {
        StoredRecord {
            id: "rec-1".to_string(),
            document: "pump pressure".to_string(),
            embedding: vec![0.5, 0.25],
            metadata: ChunkMetadata {
                source: "pdf".to_string(),
                filename: "manual.pdf".to_string(),
                chunk_num: 1,
            },
        }
    }

    #[tokio::test]
    async fn get_collection_parses_id_and_dimension() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{BASE}/documents"));
                then.status(200).json_body(json!({
                    "id": "col-123",
                    "name": "documents",
                    "dimension": 768,
                    "metadata": {"embedding_model": "embeddinggemma:300m"}
                }));
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        let collection = store.get_collection("documents").await.unwrap();

        mock.assert_async().await;
        assert_eq!(collection.id, "col-123");
        assert_eq!(collection.dimension, Some(768));
        assert_eq!(collection.embedding_model(), Some("embeddinggemma:300m"));
    }

    #[tokio::test]
    async fn get_missing_collection_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{BASE}/documents"));
                then.status(404).body("collection not found");
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        let error = store.get_collection("documents").await.unwrap_err();

        assert!(matches!(
            error,
            PipelineError::Provisioning {
                source: UpstreamError::Status { status: 404, .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn create_collection_posts_name_and_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(BASE).json_body(json!({
                    "name": "documents",
                    "metadata": {"embedding_model": "m"}
                }));
                then.status(201).json_body(json!({"id": "new-id", "name": "documents"}));
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        let mut metadata = serde_json::Map::new();
        metadata.insert("embedding_model".to_string(), json!("m"));
        let collection = store
            .create_collection("documents", Some(metadata))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(collection.id, "new-id");
        assert_eq!(collection.dimension, None);
    }

    #[tokio::test]
    async fn delete_treats_not_found_as_outcome() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{BASE}/ghost"));
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{BASE}/documents"));
                then.status(200).json_body(json!({}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{BASE}/locked"));
                then.status(500).body("boom");
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        assert_eq!(
            store.delete_collection("ghost").await.unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(
            store.delete_collection("documents").await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(matches!(
            store.delete_collection("locked").await,
            Err(PipelineError::Provisioning { .. })
        ));
    }

    #[tokio::test]
    async fn add_sends_single_record_batch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{BASE}/col-1/add"))
                    .json_body(json!({
                        "documents": ["pump pressure"],
                        "metadatas": [{"source": "pdf", "filename": "manual.pdf", "chunk_num": 1}],
                        "ids": ["rec-1"],
                        "embeddings": [[0.5, 0.25]]
                    }));
                then.status(201).json_body(json!(true));
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        store.add("col-1", &record()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn add_failure_is_a_store_write_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(format!("{BASE}/col-1/add"));
                then.status(422).body("dimension mismatch");
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        let error = store.add("col-1", &record()).await.unwrap_err();
        match error {
            PipelineError::StoreWrite(UpstreamError::Status { status, body, .. }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "dimension mismatch");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn query_sends_embedding_and_parses_results() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{BASE}/col-1/query"))
                    .json_body(json!({"query_embeddings": [[0.5, 0.25]], "n_results": 5}));
                then.status(200).json_body(json!({
                    "ids": [["a"]],
                    "documents": [["pump pressure"]],
                    "metadatas": [[{"source": "pdf", "filename": "manual.pdf", "chunk_num": 1}]],
                    "distances": [[0.125]],
                    "embeddings": null,
                    "include": ["documents", "metadatas", "distances"]
                }));
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        let result = store.query("col-1", &[0.5, 0.25], 5).await.unwrap();

        mock.assert_async().await;
        let hits = result.hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].distance, Some(0.125));
        assert_eq!(hits[0].filename(), Some("manual.pdf"));
    }

    #[tokio::test]
    async fn query_failure_is_a_store_query_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(format!("{BASE}/col-1/query"));
                then.status(500).body("index unavailable");
            })
            .await;

        let store = ChromaStore::new(&server.base_url()).unwrap();
        assert!(matches!(
            store.query("col-1", &[0.5], 5).await,
            Err(PipelineError::StoreQuery(_))
        ));
    }

    #[test]
    fn endpoint_must_be_a_base_url() {
        assert!(ChromaStore::new("not a url").is_err());
        assert!(ChromaStore::new("mailto:chroma@example.com").is_err());
    }
}
