use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value as JsonValue};

use crate::api::query::QueryDefinition;
use crate::api::{DocumentSnapshot, WriteResult};
use crate::error::{internal_error, ProtoStoreResult, RpcStatus};
use crate::model::{DatabaseId, DocumentKey};
use crate::remote::connection::{encode_resource_path, Connection, ConnectionBuilder, RequestContext};
use crate::remote::serializer::JsonProtoSerializer;
use crate::value::MapValue;

use super::{Datastore, NoopTokenProvider, TokenProviderArc};

/// Datastore speaking the Firestore REST v1 protocol.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    request_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    request_timeout: Option<Duration>,
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    pub fn from_database_id(database_id: DatabaseId) -> ProtoStoreResult<Self> {
        Self::builder(database_id).build()
    }

    pub fn base_url(&self) -> &str {
        self.connection.base_url()
    }

    async fn build_request_context(&self) -> ProtoStoreResult<RequestContext> {
        let auth_token = self.auth_provider.get_token().await?;
        Ok(RequestContext {
            auth_token,
            request_timeout: self.request_timeout,
        })
    }

    /// Drops the cached token after an authentication failure so the next call refreshes it.
    fn observe<T>(&self, result: ProtoStoreResult<T>) -> ProtoStoreResult<T> {
        if let Err(err) = &result {
            if err.status() == Some(RpcStatus::Unauthenticated) {
                log::warn!("Request rejected as unauthenticated; invalidating cached token");
                self.auth_provider.invalidate_token();
            }
        }
        result
    }

    async fn commit_single(&self, write: JsonValue) -> ProtoStoreResult<WriteResult> {
        let body = self.serializer.encode_commit_body(vec![write]);
        let context = self.build_request_context().await?;
        let response = self.observe(
            self.connection
                .invoke_json(Method::POST, "documents:commit", Some(&body), &context)
                .await,
        )?;
        self.serializer.decode_write_result(&response)
    }

    fn build_structured_query(&self, definition: &QueryDefinition) -> JsonValue {
        let mut structured = serde_json::Map::new();
        structured.insert(
            "from".to_string(),
            json!([{ "collectionId": definition.collection_id() }]),
        );
        structured.insert(
            "orderBy".to_string(),
            json!([{
                "field": { "fieldPath": "__name__" },
                "direction": "ASCENDING"
            }]),
        );
        if let Some(limit) = definition.limit {
            structured.insert("limit".to_string(), json!(limit));
        }
        JsonValue::Object(structured)
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn get_document(&self, key: &DocumentKey) -> ProtoStoreResult<DocumentSnapshot> {
        let doc_path = format!("documents/{}", encode_resource_path(key.path()));
        let context = self.build_request_context().await?;
        let response = self.observe(
            self.connection
                .invoke_json_optional(Method::GET, &doc_path, None, &context)
                .await,
        )?;

        match response {
            Some(json) => {
                let snapshot = self.serializer.decode_document(&json)?;
                if snapshot.document_key() != key {
                    return Err(internal_error(format!(
                        "Requested {} but the backend returned {}",
                        key.path(),
                        snapshot.document_key().path()
                    )));
                }
                Ok(snapshot)
            }
            None => Ok(DocumentSnapshot::new(key.clone(), None)),
        }
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> ProtoStoreResult<WriteResult> {
        self.commit_single(self.serializer.encode_set_write(key, &data)).await
    }

    async fn delete_document(&self, key: &DocumentKey) -> ProtoStoreResult<WriteResult> {
        self.commit_single(self.serializer.encode_delete_write(key)).await
    }

    async fn run_query(&self, query: &QueryDefinition) -> ProtoStoreResult<Vec<DocumentSnapshot>> {
        let parent_path = query.parent_path();
        let request_path = if parent_path.is_empty() {
            "documents:runQuery".to_string()
        } else {
            format!("documents/{}:runQuery", encode_resource_path(&parent_path))
        };
        let body = json!({
            "structuredQuery": self.build_structured_query(query)
        });

        let context = self.build_request_context().await?;
        let response = self.observe(
            self.connection
                .invoke_json(Method::POST, &request_path, Some(&body), &context)
                .await,
        )?;

        let results = response
            .as_array()
            .ok_or_else(|| internal_error("runQuery response must be an array"))?;

        // Entries without a document only report read progress.
        results
            .iter()
            .filter_map(|entry| entry.get("document"))
            .map(|document| self.serializer.decode_document(document))
            .collect()
    }
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        let auth_provider: TokenProviderArc = Arc::new(NoopTokenProvider);
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider,
            request_timeout: None,
        }
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn build(self) -> ProtoStoreResult<HttpDatastore> {
        let connection = self.connection_builder.build()?;
        Ok(HttpDatastore {
            connection,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            request_timeout: self.request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::reference::resolve_collection_reference;
    use crate::remote::datastore::TokenProvider;
    use crate::test_support::start_mock_server;
    use crate::value::FirestoreValue;
    use httpmock::prelude::*;
    use std::panic;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOCS_PREFIX: &str = "projects/demo-project/databases/(default)/documents";

    fn database_id() -> DatabaseId {
        DatabaseId::default("demo-project")
    }

    fn datastore_for(server: &MockServer, provider: TokenProviderArc) -> HttpDatastore {
        let connection_builder =
            Connection::builder(database_id()).with_emulator_host(server.address().to_string());
        HttpDatastore::builder(database_id())
            .with_connection_builder(connection_builder)
            .with_auth_provider(provider)
            .build()
            .expect("datastore")
    }

    #[derive(Default)]
    struct CountingTokenProvider {
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingTokenProvider {
        async fn get_token(&self) -> ProtoStoreResult<Option<String>> {
            Ok(Some("token-1".to_string()))
        }

        fn invalidate_token(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    macro_rules! mock_server_or_skip {
        ($name:literal) => {
            match panic::catch_unwind(|| start_mock_server()) {
                Ok(server) => server,
                Err(_) => {
                    eprintln!(concat!("Skipping ", $name, ": unable to bind httpmock server in this environment."));
                    return;
                }
            }
        };
    }

    #[tokio::test]
    async fn get_missing_document_is_absent() {
        let server = mock_server_or_skip!("get_missing_document_is_absent");
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/v1/{DOCS_PREFIX}/queue/t1"))
                .header("authorization", "Bearer token-1");
            then.status(404)
                .json_body(serde_json::json!({ "error": { "code": 404, "status": "NOT_FOUND" } }));
        });

        let datastore = datastore_for(&server, Arc::new(CountingTokenProvider::default()));
        let key = DocumentKey::from_string("queue/t1").unwrap();
        let snapshot = datastore.get_document(&key).await.unwrap();
        mock.assert();
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn get_document_decodes_fields() {
        let server = mock_server_or_skip!("get_document_decodes_fields");
        let _mock = server.mock(|when, then| {
            when.method(GET).path(format!("/v1/{DOCS_PREFIX}/queue/t1"));
            then.status(200).json_body(serde_json::json!({
                "name": format!("{DOCS_PREFIX}/queue/t1"),
                "fields": { "proto": { "stringValue": "CgJ0MQ==" } },
                "updateTime": "2024-03-01T00:00:00Z"
            }));
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let key = DocumentKey::from_string("queue/t1").unwrap();
        let snapshot = datastore.get_document(&key).await.unwrap();
        assert_eq!(snapshot.get("proto"), Some(&FirestoreValue::from_string("CgJ0MQ==")));
    }

    #[tokio::test]
    async fn set_document_commits_full_overwrite() {
        let server = mock_server_or_skip!("set_document_commits_full_overwrite");
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DOCS_PREFIX}:commit"))
                .json_body(serde_json::json!({
                    "writes": [{
                        "update": {
                            "name": format!("{DOCS_PREFIX}/queue/t1"),
                            "fields": { "proto": { "stringValue": "CgJ0MQ==" } }
                        }
                    }]
                }));
            then.status(200).json_body(serde_json::json!({
                "writeResults": [{ "updateTime": "2024-03-01T00:00:05Z" }],
                "commitTime": "2024-03-01T00:00:05Z"
            }));
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let key = DocumentKey::from_string("queue/t1").unwrap();
        let data: MapValue = [("proto", FirestoreValue::from_string("CgJ0MQ=="))].into_iter().collect();
        let result = datastore.set_document(&key, data).await.unwrap();
        mock.assert();
        assert_eq!(result.update_time().seconds, 1_709_251_205);
    }

    #[tokio::test]
    async fn delete_document_commits_delete_write() {
        let server = mock_server_or_skip!("delete_document_commits_delete_write");
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DOCS_PREFIX}:commit"))
                .json_body(serde_json::json!({
                    "writes": [{ "delete": format!("{DOCS_PREFIX}/queue/t1") }]
                }));
            then.status(200).json_body(serde_json::json!({
                "writeResults": [{}],
                "commitTime": "2024-03-01T00:00:05Z"
            }));
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let key = DocumentKey::from_string("queue/t1").unwrap();
        datastore.delete_document(&key).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn run_query_targets_parent_document() {
        let server = mock_server_or_skip!("run_query_targets_parent_document");
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/v1/{DOCS_PREFIX}/queues/jobs:runQuery"))
                .json_body(serde_json::json!({
                    "structuredQuery": {
                        "from": [{ "collectionId": "pending" }],
                        "orderBy": [{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }],
                        "limit": 1
                    }
                }));
            then.status(200).json_body(serde_json::json!([
                {
                    "document": {
                        "name": format!("{DOCS_PREFIX}/queues/jobs/pending/j1"),
                        "fields": { "proto": { "stringValue": "" } }
                    },
                    "readTime": "2024-03-01T00:00:00Z"
                }
            ]));
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let collection = resolve_collection_reference(&database_id(), "queues/jobs/pending").unwrap();
        let query = QueryDefinition::new(&collection).with_limit(1);
        let documents = datastore.run_query(&query).await.unwrap();
        mock.assert();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id(), "j1");
    }

    #[tokio::test]
    async fn empty_query_result_only_has_read_time() {
        let server = mock_server_or_skip!("empty_query_result_only_has_read_time");
        let _mock = server.mock(|when, then| {
            when.method(POST).path(format!("/v1/{DOCS_PREFIX}:runQuery"));
            then.status(200)
                .json_body(serde_json::json!([{ "readTime": "2024-03-01T00:00:00Z" }]));
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let collection = resolve_collection_reference(&database_id(), "queue").unwrap();
        let documents = datastore.run_query(&QueryDefinition::new(&collection)).await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_response_invalidates_token() {
        let server = mock_server_or_skip!("unauthenticated_response_invalidates_token");
        let _mock = server.mock(|when, then| {
            when.method(GET).path(format!("/v1/{DOCS_PREFIX}/queue/t1"));
            then.status(401).json_body(serde_json::json!({
                "error": { "code": 401, "message": "token expired", "status": "UNAUTHENTICATED" }
            }));
        });

        let provider = Arc::new(CountingTokenProvider::default());
        let datastore = datastore_for(&server, provider.clone());
        let key = DocumentKey::from_string("queue/t1").unwrap();
        let err = datastore.get_document(&key).await.unwrap_err();
        assert_eq!(err.status(), Some(RpcStatus::Unauthenticated));
        assert_eq!(provider.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_surface_as_operation_errors() {
        let server = mock_server_or_skip!("server_errors_surface_as_operation_errors");
        let _mock = server.mock(|when, then| {
            when.method(POST).path(format!("/v1/{DOCS_PREFIX}:commit"));
            then.status(503).body("unavailable");
        });

        let datastore = datastore_for(&server, Arc::new(NoopTokenProvider));
        let key = DocumentKey::from_string("queue/t1").unwrap();
        let err = datastore.delete_document(&key).await.unwrap_err();
        assert!(err.is_operation());
        assert_eq!(err.status(), Some(RpcStatus::Unavailable));
    }
}
