use futures::FutureExt;
use prost::Message;

use crate::api::client::{PendingResult, ProtoClient};
use crate::api::query::QueryDefinition;
use crate::api::{MessageWithId, QuerySnapshot};
use crate::codec::decode_document;
use crate::error::{ProtoStoreError, ProtoStoreResult};

impl ProtoClient {
    /// Reads every document directly inside the collection at `path`.
    pub fn get_documents_async(&self, path: &str) -> ProtoStoreResult<PendingResult<QuerySnapshot>> {
        let collection = self.collection_reference(path)?;
        let query = QueryDefinition::new(&collection);
        let datastore = self.datastore();
        Ok(async move {
            let documents = datastore.run_query(&query).await?;
            Ok(QuerySnapshot::new(query.collection_path, documents))
        }
        .boxed())
    }

    /// Decodes every document of the collection at `path`.
    ///
    /// The first document that fails to decode aborts the whole listing; its error
    /// names the document id and its position.
    pub fn list_proto_documents_async<M>(&self, path: &str) -> ProtoStoreResult<PendingResult<Vec<M>>>
    where
        M: Message + Default + 'static,
    {
        let pending = self.get_documents_async(path)?;
        Ok(async move {
            let snapshot = pending.await?;
            let mut messages = Vec::with_capacity(snapshot.len());
            for (index, document) in snapshot.documents().iter().enumerate() {
                let message = decode_document(document).map_err(|err| {
                    log::warn!("Listing of {} stopped at document {}: {err}", snapshot.collection_path(), document.id());
                    ProtoStoreError::new(
                        err.code,
                        format!("Document '{}' at index {index}: {}", document.id(), err.message()),
                    )
                })?;
                messages.push(message);
            }
            Ok(messages)
        }
        .boxed())
    }

    /// Decodes the first document of the collection at `path`, if there is one.
    ///
    /// With `should_remove` the document that was read is deleted before returning.
    /// A document that fails to decode is left in place.
    pub fn get_document_from_collection_async<M>(
        &self,
        path: &str,
        should_remove: bool,
    ) -> ProtoStoreResult<PendingResult<Option<MessageWithId<M>>>>
    where
        M: Message + Default + 'static,
    {
        let collection = self.collection_reference(path)?;
        let query = QueryDefinition::new(&collection).with_limit(1);
        let datastore = self.datastore();
        Ok(async move {
            let documents = datastore.run_query(&query).await?;
            let Some(document) = documents.into_iter().next() else {
                return Ok(None);
            };
            let message: M = decode_document(&document)?;
            if should_remove {
                datastore.delete_document(document.document_key()).await?;
                log::debug!("Removed {} from {}", document.id(), query.collection_path);
            }
            Ok(Some(MessageWithId::new(document.id(), message)))
        }
        .boxed())
    }

    /// Reads the first document of the collection at `path` without removing it.
    pub fn get_first_proto_document_async<M>(&self, path: &str) -> ProtoStoreResult<PendingResult<Option<MessageWithId<M>>>>
    where
        M: Message + Default + 'static,
    {
        self.get_document_from_collection_async(path, false)
    }

    /// Takes the first document out of the collection at `path`.
    ///
    /// Not atomic: two concurrent callers may both receive the same document.
    ///
    /// A head document that fails to decode stays in place, so every pop keeps failing
    /// with the same error until it is removed. The error message names the document
    /// path; pass it to [`delete_document_async`](Self::delete_document_async) (or fix the
    /// document) to unblock the collection.
    pub fn pop_proto_document_async<M>(&self, path: &str) -> ProtoStoreResult<PendingResult<Option<MessageWithId<M>>>>
    where
        M: Message + Default + 'static,
    {
        self.get_document_from_collection_async(path, true)
    }
}
