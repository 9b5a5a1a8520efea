use crate::api::reference::CollectionReference;
use crate::model::{DocumentKey, ResourcePath};

/// Read of the direct children of one collection, ordered by document name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryDefinition {
    pub collection_path: ResourcePath,
    pub limit: Option<u32>,
}

impl QueryDefinition {
    pub fn new(collection: &CollectionReference) -> Self {
        Self {
            collection_path: collection.path().clone(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Path of the document that owns the collection; empty for top-level collections.
    pub fn parent_path(&self) -> ResourcePath {
        self.collection_path.without_last()
    }

    pub fn collection_id(&self) -> &str {
        self.collection_path.last_segment().unwrap_or_default()
    }

    /// Whether `key` is a direct child of the queried collection.
    pub fn matches(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}
