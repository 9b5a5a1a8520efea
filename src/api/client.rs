use futures::future::BoxFuture;

use crate::api::reference::{
    resolve_collection_reference, resolve_document_reference, CollectionReference, DocumentReference,
};
use crate::error::ProtoStoreResult;
use crate::remote::DatastoreArc;
use crate::session::Session;

/// An operation that has been validated and is ready to run; await it to execute.
pub type PendingResult<T> = BoxFuture<'static, ProtoStoreResult<T>>;

/// Stores and retrieves protocol messages in documents of one session's database.
///
/// Every operation comes in two forms. `*_async` methods resolve the path up front,
/// failing with `proto-store/invalid-path` before anything is sent, and return a
/// [`PendingResult`]. The methods without the suffix run the same operation to
/// completion on the calling thread.
#[derive(Clone, Debug)]
pub struct ProtoClient {
    session: Session,
}

impl ProtoClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn document_reference(&self, path: &str) -> ProtoStoreResult<DocumentReference> {
        resolve_document_reference(self.session.database_id(), path)
    }

    pub fn collection_reference(&self, path: &str) -> ProtoStoreResult<CollectionReference> {
        resolve_collection_reference(self.session.database_id(), path)
    }

    pub(crate) fn datastore(&self) -> DatastoreArc {
        self.session.datastore().clone()
    }
}
