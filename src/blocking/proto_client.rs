use prost::Message;

use super::block_on;
use crate::api::{DocumentSnapshot, MessageWithId, ProtoClient, QuerySnapshot, WriteResult};
use crate::error::ProtoStoreResult;
use crate::value::MapValue;

macro_rules! block_on_methods {
    ($(fn $name:ident = $async_name:ident($($arg:ident : $ty:ty),*) -> $ret:ty);* $(;)?) => {
        $(pub fn $name(&self, $($arg: $ty),*) -> ProtoStoreResult<$ret> {
            block_on(self.$async_name($($arg),*))
        })*
    };
}

impl ProtoClient {
    block_on_methods! {
        fn get_document = get_document_async(path: &str) -> DocumentSnapshot;
        fn get_document_in = get_document_in_async(collection: &str, document_id: &str) -> DocumentSnapshot;
        fn set_document = set_document_async(path: &str, data: MapValue) -> WriteResult;
        fn set_document_in = set_document_in_async(collection: &str, document_id: &str, data: MapValue) -> WriteResult;
        fn delete_document = delete_document_async(path: &str) -> WriteResult;
        fn delete_document_in = delete_document_in_async(collection: &str, document_id: &str) -> WriteResult;
        fn get_documents = get_documents_async(path: &str) -> QuerySnapshot;
    }

    pub fn get_proto_document<M>(&self, path: &str) -> ProtoStoreResult<Option<M>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.get_proto_document_async(path))
    }

    pub fn get_proto_document_in<M>(&self, collection: &str, document_id: &str) -> ProtoStoreResult<Option<M>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.get_proto_document_in_async(collection, document_id))
    }

    pub fn set_proto_document<M: Message>(&self, path: &str, message: &M) -> ProtoStoreResult<WriteResult> {
        block_on(self.set_proto_document_async(path, message))
    }

    pub fn set_proto_document_in<M: Message>(
        &self,
        collection: &str,
        document_id: &str,
        message: &M,
    ) -> ProtoStoreResult<WriteResult> {
        block_on(self.set_proto_document_in_async(collection, document_id, message))
    }

    pub fn add_proto_document<M: Message>(&self, collection: &str, message: &M) -> ProtoStoreResult<String> {
        block_on(self.add_proto_document_async(collection, message))
    }

    pub fn list_proto_documents<M>(&self, path: &str) -> ProtoStoreResult<Vec<M>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.list_proto_documents_async(path))
    }

    pub fn get_document_from_collection<M>(
        &self,
        path: &str,
        should_remove: bool,
    ) -> ProtoStoreResult<Option<MessageWithId<M>>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.get_document_from_collection_async(path, should_remove))
    }

    pub fn get_first_proto_document<M>(&self, path: &str) -> ProtoStoreResult<Option<MessageWithId<M>>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.get_first_proto_document_async(path))
    }

    pub fn pop_proto_document<M>(&self, path: &str) -> ProtoStoreResult<Option<MessageWithId<M>>>
    where
        M: Message + Default + 'static,
    {
        block_on(self.pop_proto_document_async(path))
    }
}
