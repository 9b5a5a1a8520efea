//! Store protocol buffer messages in Cloud Firestore documents.
//!
//! Each message is kept as a base64 string under the `proto` field of one document,
//! so any `prost` message can be written, read back, listed per collection or
//! consumed queue-style with [`ProtoClient::pop_proto_document`].
//!
//! ```no_run
//! use firestore_proto::{ProtoClient, Session};
//!
//! #[derive(Clone, PartialEq, prost::Message)]
//! struct Task {
//!     #[prost(string, tag = "1")]
//!     id: String,
//! }
//!
//! # fn main() -> Result<(), firestore_proto::ProtoStoreError> {
//! let session = Session::from_service_account_file("service-account.json")?;
//! let client = ProtoClient::new(session);
//!
//! client.set_proto_document("queue/t1", &Task { id: "t1".into() })?;
//! if let Some(entry) = client.pop_proto_document::<Task>("queue")? {
//!     println!("took {}", entry.id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod blocking;
pub mod codec;
pub mod constants;
pub mod error;
pub mod model;
pub mod remote;
mod session;
pub mod value;

#[cfg(test)]
pub mod test_support;

pub use api::{
    join_path, resolve_collection_reference, resolve_document_reference, CollectionReference, DocumentReference,
    DocumentSnapshot, MessageWithId, PendingResult, ProtoClient, QuerySnapshot, WriteResult,
};
pub use codec::{decode_document, decode_message, encode_message};
pub use constants::PROTO_FIELD;
pub use error::{ProtoStoreError, ProtoStoreErrorCode, ProtoStoreResult, RpcStatus};
pub use session::{Session, SessionBuilder};
