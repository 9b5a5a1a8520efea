use futures::FutureExt;
use prost::Message;

use crate::api::client::{PendingResult, ProtoClient};
use crate::api::reference::join_path;
use crate::api::{DocumentSnapshot, WriteResult};
use crate::codec::{decode_document, encode_message};
use crate::error::ProtoStoreResult;
use crate::value::MapValue;

impl ProtoClient {
    /// Reads the raw document at `path`.
    ///
    /// A missing document is not an error: the snapshot reports `exists() == false`.
    pub fn get_document_async(&self, path: &str) -> ProtoStoreResult<PendingResult<DocumentSnapshot>> {
        let reference = self.document_reference(path)?;
        let datastore = self.datastore();
        Ok(async move { datastore.get_document(reference.key()).await }.boxed())
    }

    pub fn get_document_in_async(
        &self,
        collection: &str,
        document_id: &str,
    ) -> ProtoStoreResult<PendingResult<DocumentSnapshot>> {
        self.get_document_async(&join_path(collection, document_id))
    }

    /// Reads and decodes the message stored at `path`; `None` when nothing is stored.
    pub fn get_proto_document_async<M>(&self, path: &str) -> ProtoStoreResult<PendingResult<Option<M>>>
    where
        M: Message + Default + 'static,
    {
        let pending = self.get_document_async(path)?;
        Ok(async move {
            let snapshot = pending.await?;
            if !snapshot.exists() {
                return Ok(None);
            }
            decode_document(&snapshot).map(Some)
        }
        .boxed())
    }

    pub fn get_proto_document_in_async<M>(
        &self,
        collection: &str,
        document_id: &str,
    ) -> ProtoStoreResult<PendingResult<Option<M>>>
    where
        M: Message + Default + 'static,
    {
        self.get_proto_document_async(&join_path(collection, document_id))
    }

    /// Replaces the whole document at `path` with `data`.
    pub fn set_document_async(&self, path: &str, data: MapValue) -> ProtoStoreResult<PendingResult<WriteResult>> {
        let reference = self.document_reference(path)?;
        let datastore = self.datastore();
        Ok(async move { datastore.set_document(reference.key(), data).await }.boxed())
    }

    pub fn set_document_in_async(
        &self,
        collection: &str,
        document_id: &str,
        data: MapValue,
    ) -> ProtoStoreResult<PendingResult<WriteResult>> {
        self.set_document_async(&join_path(collection, document_id), data)
    }

    /// Encodes `message` and stores it as the only content of the document at `path`.
    pub fn set_proto_document_async<M>(&self, path: &str, message: &M) -> ProtoStoreResult<PendingResult<WriteResult>>
    where
        M: Message,
    {
        self.set_document_async(path, encode_message(message))
    }

    pub fn set_proto_document_in_async<M>(
        &self,
        collection: &str,
        document_id: &str,
        message: &M,
    ) -> ProtoStoreResult<PendingResult<WriteResult>>
    where
        M: Message,
    {
        self.set_proto_document_async(&join_path(collection, document_id), message)
    }

    /// Deletes the document at `path`. Deleting a missing document succeeds.
    pub fn delete_document_async(&self, path: &str) -> ProtoStoreResult<PendingResult<WriteResult>> {
        let reference = self.document_reference(path)?;
        let datastore = self.datastore();
        Ok(async move { datastore.delete_document(reference.key()).await }.boxed())
    }

    pub fn delete_document_in_async(
        &self,
        collection: &str,
        document_id: &str,
    ) -> ProtoStoreResult<PendingResult<WriteResult>> {
        self.delete_document_async(&join_path(collection, document_id))
    }

    /// Stores `message` under a freshly generated id in `collection` and returns the id.
    pub fn add_proto_document_async<M>(&self, collection: &str, message: &M) -> ProtoStoreResult<PendingResult<String>>
    where
        M: Message,
    {
        let reference = self.collection_reference(collection)?.new_doc()?;
        let data = encode_message(message);
        let datastore = self.datastore();
        Ok(async move {
            datastore.set_document(reference.key(), data).await?;
            Ok(reference.id().to_string())
        }
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PROTO_FIELD;
    use crate::error::ProtoStoreErrorCode;
    use crate::session::Session;
    use crate::value::FirestoreValue;

    #[derive(Clone, PartialEq, Message)]
    struct Job {
        #[prost(string, tag = "1")]
        name: String,
        #[prost(int64, tag = "2")]
        priority: i64,
    }

    fn client() -> ProtoClient {
        ProtoClient::new(Session::in_memory("demo"))
    }

    fn job(name: &str) -> Job {
        Job {
            name: name.into(),
            priority: 7,
        }
    }

    #[tokio::test]
    async fn proto_round_trip_through_store() {
        let client = client();
        client.set_proto_document_async("jobs/j1", &job("j1")).unwrap().await.unwrap();
        let loaded: Option<Job> = client.get_proto_document_async("jobs/j1").unwrap().await.unwrap();
        assert_eq!(loaded, Some(job("j1")));
    }

    #[tokio::test]
    async fn collection_and_id_variants_share_paths() {
        let client = client();
        client
            .set_proto_document_in_async("queues/jobs/pending", "j1", &job("nested"))
            .unwrap()
            .await
            .unwrap();
        let loaded: Option<Job> = client
            .get_proto_document_async("queues/jobs/pending/j1")
            .unwrap()
            .await
            .unwrap();
        assert_eq!(loaded, Some(job("nested")));

        client.delete_document_in_async("queues/jobs/pending/", "j1").unwrap().await.unwrap();
        let snapshot = client.get_document_in_async("queues/jobs/pending", "j1").unwrap().await.unwrap();
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let loaded: Option<Job> = client().get_proto_document_async("jobs/ghost").unwrap().await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn invalid_paths_fail_before_running() {
        let client = client();
        let err = client.get_document_async("jobs").err().unwrap();
        assert_eq!(err.code, ProtoStoreErrorCode::InvalidPath);
        let err = client.set_proto_document_async("jobs/j1/runs", &job("x")).err().unwrap();
        assert_eq!(err.code, ProtoStoreErrorCode::InvalidPath);
        let err = client.add_proto_document_async("jobs/j1", &job("x")).err().unwrap();
        assert_eq!(err.code, ProtoStoreErrorCode::InvalidPath);
    }

    #[tokio::test]
    async fn non_string_payload_is_io_error() {
        let client = client();
        let data: MapValue = [(PROTO_FIELD, FirestoreValue::from_integer(5))].into_iter().collect();
        client.set_document_async("jobs/bad", data).unwrap().await.unwrap();
        let err = client.get_proto_document_async::<Job>("jobs/bad").unwrap().await.unwrap_err();
        assert_eq!(err.code, ProtoStoreErrorCode::Io);
    }

    #[tokio::test]
    async fn added_documents_get_generated_ids() {
        let client = client();
        let id = client.add_proto_document_async("jobs", &job("auto")).unwrap().await.unwrap();
        assert_eq!(id.len(), 20);
        let loaded: Option<Job> = client.get_proto_document_in_async("jobs", &id).unwrap().await.unwrap();
        assert_eq!(loaded, Some(job("auto")));
    }
}
