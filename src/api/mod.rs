mod client;
mod collection_query;
mod document_store;
pub mod query;
pub mod reference;
mod snapshot;

pub use client::{PendingResult, ProtoClient};
pub use query::QueryDefinition;
pub use reference::{
    join_path, resolve_collection_reference, resolve_document_reference, CollectionReference, DocumentReference,
};
pub use snapshot::{DocumentSnapshot, MessageWithId, QuerySnapshot, WriteResult};
