use std::sync::Arc;

use async_trait::async_trait;

use crate::api::query::QueryDefinition;
use crate::api::{DocumentSnapshot, WriteResult};
use crate::error::ProtoStoreResult;
use crate::model::DocumentKey;
use crate::value::MapValue;

pub mod http;
pub mod in_memory;

/// Document storage backend shared by every operation of a session.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Reads one document; a missing document yields a snapshot whose `exists()` is false.
    async fn get_document(&self, key: &DocumentKey) -> ProtoStoreResult<DocumentSnapshot>;

    /// Replaces the whole content of the document with `data`.
    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> ProtoStoreResult<WriteResult>;

    /// Removes the document. Deleting a missing document succeeds.
    async fn delete_document(&self, key: &DocumentKey) -> ProtoStoreResult<WriteResult>;

    /// Lists the direct children of a collection ordered by document name.
    async fn run_query(&self, query: &QueryDefinition) -> ProtoStoreResult<Vec<DocumentSnapshot>>;
}

/// Source of bearer tokens attached to remote requests.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> ProtoStoreResult<Option<String>>;
    fn invalidate_token(&self);
}

#[derive(Default, Clone)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> ProtoStoreResult<Option<String>> {
        Ok(None)
    }

    fn invalidate_token(&self) {}
}

pub type DatastoreArc = Arc<dyn Datastore>;
pub type TokenProviderArc = Arc<dyn TokenProvider>;

pub use http::{HttpDatastore, HttpDatastoreBuilder};
pub use in_memory::InMemoryDatastore;
