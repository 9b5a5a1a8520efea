use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};

use crate::constants::{AUTO_ID_LENGTH, PATH_SEPARATOR};
use crate::error::{invalid_argument, invalid_path, ProtoStoreResult};
use crate::model::{DatabaseId, DocumentKey, ResourcePath};

/// Handle to one collection, valid for a single operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionReference {
    root: DatabaseId,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(root: DatabaseId, path: ResourcePath) -> ProtoStoreResult<Self> {
        if path.len() % 2 != 1 {
            return Err(invalid_path(format!(
                "Path length should be odd but is {}",
                path.len()
            )));
        }
        Ok(Self { root, path })
    }

    /// A collection directly under the database root.
    pub fn top_level(root: DatabaseId, name: &str) -> ProtoStoreResult<Self> {
        validate_segment(name)?;
        Self::new(root, ResourcePath::from_segments([name]))
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.root
    }

    /// The full logical path of the collection (e.g. `queues/jobs/pending`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns the document that contains this collection, if any.
    pub fn parent(&self) -> Option<DocumentReference> {
        self.path.pop_last().and_then(|parent_path| {
            if parent_path.is_empty() {
                return None;
            }
            DocumentReference::new(self.root.clone(), parent_path).ok()
        })
    }

    /// Returns a reference to the document identified by `document_id`.
    pub fn doc(&self, document_id: &str) -> ProtoStoreResult<DocumentReference> {
        validate_segment(document_id)?;
        DocumentReference::new(self.root.clone(), self.path.child([document_id]))
    }

    /// Returns a reference to a new document with a generated id.
    pub fn new_doc(&self) -> ProtoStoreResult<DocumentReference> {
        self.doc(&generate_auto_id())
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path.canonical_string())
    }
}

/// Handle to one document, valid for a single operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentReference {
    root: DatabaseId,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(root: DatabaseId, path: ResourcePath) -> ProtoStoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { root, key })
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.root
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            root: self.root.clone(),
            path: self.key.collection_path(),
        }
    }

    /// Returns a reference to a subcollection of this document.
    pub fn collection(&self, name: &str) -> ProtoStoreResult<CollectionReference> {
        validate_segment(name)?;
        CollectionReference::new(self.root.clone(), self.key.path().child([name]))
    }

    /// Fully qualified resource name, as used on the wire.
    pub fn name(&self) -> String {
        format!(
            "{}/documents/{}",
            self.root.database_name(),
            self.key.path().canonical_string()
        )
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path().canonical_string())
    }
}

/// Resolves a slash-delimited path with an even number of segments to a document.
///
/// The first segment names a top-level collection; the remaining segments are
/// consumed pairwise as (document id, subcollection name) until the last one,
/// which names the document.
pub fn resolve_document_reference(root: &DatabaseId, path: &str) -> ProtoStoreResult<DocumentReference> {
    let path = ResourcePath::from_string(path)?;
    if path.len() % 2 != 0 {
        return Err(invalid_path(format!(
            "Path length should be even but is {}",
            path.len()
        )));
    }
    let (document_id, collection_segments) = path
        .split_last()
        .ok_or_else(|| invalid_path("Path must contain at least one segment"))?;
    collection_chain(root, collection_segments)?.doc(document_id)
}

/// Resolves a slash-delimited path with an odd number of segments to a collection.
pub fn resolve_collection_reference(root: &DatabaseId, path: &str) -> ProtoStoreResult<CollectionReference> {
    let path = ResourcePath::from_string(path)?;
    if path.len() % 2 != 1 {
        return Err(invalid_path(format!(
            "Path length should be odd but is {}",
            path.len()
        )));
    }
    collection_chain(root, &path)
}

/// Joins a collection path and a document id with a single separator.
pub fn join_path(collection: &str, document_id: &str) -> String {
    if collection.ends_with(PATH_SEPARATOR) {
        format!("{collection}{document_id}")
    } else {
        format!("{collection}{PATH_SEPARATOR}{document_id}")
    }
}

fn collection_chain(root: &DatabaseId, segments: &[String]) -> ProtoStoreResult<CollectionReference> {
    let (first, rest) = segments
        .split_first()
        .ok_or_else(|| invalid_path("Path must contain at least one segment"))?;
    let mut collection = CollectionReference::top_level(root.clone(), first)?;
    for pair in rest.chunks_exact(2) {
        collection = collection.doc(&pair[0])?.collection(&pair[1])?;
    }
    Ok(collection)
}

fn validate_segment(segment: &str) -> ProtoStoreResult<()> {
    if segment.is_empty() {
        return Err(invalid_path("Path segments cannot be empty"));
    }
    if segment.contains(PATH_SEPARATOR) {
        return Err(invalid_argument(format!(
            "Segment '{segment}' cannot contain '{PATH_SEPARATOR}'"
        )));
    }
    Ok(())
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtoStoreErrorCode;

    fn root() -> DatabaseId {
        DatabaseId::default("test-project")
    }

    #[test]
    fn resolves_nested_document() {
        let doc = resolve_document_reference(&root(), "queues/jobs/pending/j1").unwrap();
        assert_eq!(doc.id(), "j1");
        assert_eq!(doc.parent().id(), "pending");
        assert_eq!(doc.parent().parent().unwrap().id(), "jobs");
        assert_eq!(
            doc.name(),
            "projects/test-project/databases/(default)/documents/queues/jobs/pending/j1"
        );
    }

    #[test]
    fn resolves_nested_collection() {
        let collection = resolve_collection_reference(&root(), "queues/jobs/pending").unwrap();
        assert_eq!(collection.id(), "pending");
        assert_eq!(collection.path().canonical_string(), "queues/jobs/pending");
    }

    #[test]
    fn top_level_collection_has_no_parent() {
        let collection = resolve_collection_reference(&root(), "queue").unwrap();
        assert!(collection.parent().is_none());
    }

    #[test]
    fn document_paths_must_be_even() {
        for path in ["queue", "queue/t1/attempts"] {
            let err = resolve_document_reference(&root(), path).unwrap_err();
            assert_eq!(err.code, ProtoStoreErrorCode::InvalidPath, "path {path}");
        }
    }

    #[test]
    fn collection_paths_must_be_odd() {
        for path in ["queue/t1", "queues/jobs/pending/j1"] {
            let err = resolve_collection_reference(&root(), path).unwrap_err();
            assert_eq!(err.code, ProtoStoreErrorCode::InvalidPath, "path {path}");
        }
    }

    #[test]
    fn join_avoids_double_separator() {
        assert_eq!(join_path("jobs/", "j1"), "jobs/j1");
        assert_eq!(join_path("jobs", "j1"), "jobs/j1");
    }

    #[test]
    fn join_inverts_parent_and_id() {
        for path in ["queue/t1", "queues/jobs/pending/j1"] {
            let doc = resolve_document_reference(&root(), path).unwrap();
            let rejoined = join_path(&doc.parent().path().canonical_string(), doc.id());
            assert_eq!(rejoined, path);
        }
    }

    #[test]
    fn document_ids_cannot_contain_separator() {
        let collection = resolve_collection_reference(&root(), "queue").unwrap();
        let err = collection.doc("a/b").unwrap_err();
        assert_eq!(err.code, ProtoStoreErrorCode::InvalidArgument);
    }

    #[test]
    fn auto_ids_have_fixed_length() {
        let collection = resolve_collection_reference(&root(), "queue").unwrap();
        let doc = collection.new_doc().unwrap();
        assert_eq!(doc.id().len(), AUTO_ID_LENGTH);
        assert_eq!(doc.parent(), collection);
    }
}
