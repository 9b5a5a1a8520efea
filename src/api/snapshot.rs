use std::collections::BTreeMap;

use crate::model::{DocumentKey, ResourcePath, Timestamp};
use crate::value::{FirestoreValue, MapValue};

/// A document as read from the database; `data` is `None` when nothing is stored.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
    update_time: Option<Timestamp>,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>) -> Self {
        Self {
            key,
            data,
            update_time: None,
        }
    }

    pub fn with_update_time(mut self, update_time: Option<Timestamp>) -> Self {
        self.update_time = update_time;
        self
    }

    /// Returns whether the document exists on the backend.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the decoded document fields if the snapshot contains data.
    pub fn data(&self) -> Option<&BTreeMap<String, FirestoreValue>> {
        self.data.as_ref().map(|map| map.fields())
    }

    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.data.as_ref().and_then(|map| map.get(field))
    }

    pub(crate) fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }

    /// Last server-side modification time, when the backend reported one.
    pub fn update_time(&self) -> Option<Timestamp> {
        self.update_time
    }
}

/// Documents returned by a collection read, in backend listing order.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    collection_path: ResourcePath,
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(collection_path: ResourcePath, documents: Vec<DocumentSnapshot>) -> Self {
        Self {
            collection_path,
            documents,
        }
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// Acknowledgment of a committed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteResult {
    update_time: Timestamp,
}

impl WriteResult {
    pub fn new(update_time: Timestamp) -> Self {
        Self { update_time }
    }

    pub fn update_time(&self) -> Timestamp {
        self.update_time
    }
}

/// A decoded message together with the id of the document it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageWithId<M> {
    id: String,
    message: M,
}

impl<M> MessageWithId<M> {
    pub fn new(id: impl Into<String>, message: M) -> Self {
        Self {
            id: id.into(),
            message,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message(&self) -> &M {
        &self.message
    }

    pub fn into_parts(self) -> (String, M) {
        (self.id, self.message)
    }
}
