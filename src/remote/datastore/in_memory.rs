use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::api::query::QueryDefinition;
use crate::api::{DocumentSnapshot, WriteResult};
use crate::error::{internal_error, ProtoStoreResult};
use crate::model::{DocumentKey, Timestamp};
use crate::value::MapValue;

use super::Datastore;

/// Process-local datastore keyed by canonical document path.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<BTreeMap<String, StoredDocument>>>,
}

#[derive(Clone)]
struct StoredDocument {
    data: MapValue,
    update_time: Timestamp,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored across all collections.
    pub fn len(&self) -> ProtoStoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> ProtoStoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> ProtoStoreResult<MutexGuard<'_, BTreeMap<String, StoredDocument>>> {
        self.documents
            .lock()
            .map_err(|_| internal_error("In-memory datastore lock poisoned"))
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> ProtoStoreResult<DocumentSnapshot> {
        let store = self.lock()?;
        let snapshot = match store.get(&key.path().canonical_string()) {
            Some(stored) => DocumentSnapshot::new(key.clone(), Some(stored.data.clone()))
                .with_update_time(Some(stored.update_time)),
            None => DocumentSnapshot::new(key.clone(), None),
        };
        Ok(snapshot)
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> ProtoStoreResult<WriteResult> {
        let update_time = Timestamp::now();
        self.lock()?
            .insert(key.path().canonical_string(), StoredDocument { data, update_time });
        Ok(WriteResult::new(update_time))
    }

    async fn delete_document(&self, key: &DocumentKey) -> ProtoStoreResult<WriteResult> {
        self.lock()?.remove(&key.path().canonical_string());
        Ok(WriteResult::new(Timestamp::now()))
    }

    async fn run_query(&self, query: &QueryDefinition) -> ProtoStoreResult<Vec<DocumentSnapshot>> {
        let store = self.lock()?;
        let limit = query.limit.map(|limit| limit as usize).unwrap_or(usize::MAX);
        let mut documents = Vec::new();

        for (path, stored) in store.iter() {
            if documents.len() >= limit {
                break;
            }
            let key = DocumentKey::from_string(path)?;
            if !query.matches(&key) {
                continue;
            }
            documents.push(
                DocumentSnapshot::new(key, Some(stored.data.clone())).with_update_time(Some(stored.update_time)),
            );
        }

        Ok(documents)
    }
}
