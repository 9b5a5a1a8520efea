//! Encoding of protocol messages into document fields.
//!
//! A message is serialized to its binary form, base64-encoded (standard alphabet,
//! padded) and stored as a string under [`PROTO_FIELD`]. Other fields on a document
//! are ignored when reading.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use prost::Message;

use crate::api::DocumentSnapshot;
use crate::constants::PROTO_FIELD;
use crate::error::{decode_error, io_error, ProtoStoreError, ProtoStoreResult};
use crate::value::{FirestoreValue, MapValue};

/// Encodes `message` into the single-field map written to the database.
pub fn encode_message<M>(message: &M) -> MapValue
where
    M: Message,
{
    MapValue::new(encode_message_fields(message))
}

pub fn encode_message_fields<M>(message: &M) -> BTreeMap<String, FirestoreValue>
where
    M: Message,
{
    let encoded = BASE64_STANDARD.encode(message.encode_to_vec());
    BTreeMap::from([(PROTO_FIELD.to_string(), FirestoreValue::from_string(encoded))])
}

/// Decodes the value stored under the reserved field into `M`.
///
/// # Errors
/// `proto-store/io` when the value is not a string, `proto-store/decode` when it is
/// not base64 or the bytes are not a valid `M`.
pub fn decode_message<M>(value: &FirestoreValue) -> ProtoStoreResult<M>
where
    M: Message + Default,
{
    let text = value.as_str().ok_or_else(|| {
        io_error(format!(
            "Field '{PROTO_FIELD}' holds a {} value, expected a string",
            value.type_name()
        ))
    })?;
    let bytes = BASE64_STANDARD
        .decode(text)
        .map_err(|err| decode_error(format!("Field '{PROTO_FIELD}' is not valid base64: {err}")))?;
    M::decode(bytes.as_slice()).map_err(|err| decode_error(format!("Malformed message payload: {err}")))
}

/// Decodes a message from a document's field map.
pub fn decode_fields<M>(fields: &MapValue) -> ProtoStoreResult<M>
where
    M: Message + Default,
{
    let value = fields
        .get(PROTO_FIELD)
        .ok_or_else(|| decode_error(format!("Document has no '{PROTO_FIELD}' field")))?;
    decode_message(value)
}

/// Decodes the message held by an existing document snapshot.
pub fn decode_document<M>(snapshot: &DocumentSnapshot) -> ProtoStoreResult<M>
where
    M: Message + Default,
{
    let fields = snapshot.map_value().ok_or_else(|| {
        decode_error(format!(
            "Document {} does not exist",
            snapshot.document_key().path()
        ))
    })?;
    decode_fields(fields).map_err(|err| {
        let message = format!("Document {}: {}", snapshot.document_key().path(), err.message());
        ProtoStoreError::new(err.code, message)
    })
}
